//! Table codec for cached entries
//!
//! Entries are a versioned JSON envelope of typed cells. Decoding rebuilds the
//! table through [`Table::from_rows`], so a payload with ragged rows or an
//! unknown version is rejected as a [`CacheError::SerializationError`] and the
//! caller recomputes.

use super::errors::{CacheError, CacheResult};
use crate::table::{CellValue, Table};
use serde::{Deserialize, Serialize};

/// Bump when the envelope layout changes; older entries then read as misses
pub const CODEC_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    columns: &'a [String],
    rows: &'a [Vec<CellValue>],
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

pub fn encode_table(table: &Table) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef {
        version: CODEC_VERSION,
        columns: table.columns(),
        rows: table.rows(),
    })
    .map_err(|e| CacheError::SerializationError(format!("encode failed: {e}")))
}

pub fn decode_table(bytes: &[u8]) -> CacheResult<Table> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| CacheError::SerializationError(format!("decode failed: {e}")))?;

    if envelope.version != CODEC_VERSION {
        return Err(CacheError::SerializationError(format!(
            "unsupported envelope version {} (expected {CODEC_VERSION})",
            envelope.version
        )));
    }

    Table::from_rows(envelope.columns, envelope.rows)
        .map_err(|e| CacheError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn mixed_table() -> Table {
        Table::from_rows(
            ["zipcode", "population", "density", "active", "since", "seen_at", "note"],
            vec![
                vec![
                    CellValue::Text("90011".into()),
                    CellValue::Int(111_000),
                    CellValue::Float(0.1 + 0.2),
                    CellValue::Bool(true),
                    CellValue::Date(NaiveDate::from_ymd_opt(2010, 4, 1).unwrap()),
                    CellValue::Timestamp(Utc.with_ymd_and_hms(2016, 7, 4, 12, 30, 0).unwrap()),
                    CellValue::Null,
                ],
                vec![
                    CellValue::Text("00501".into()),
                    CellValue::Int(-1),
                    CellValue::Float(1e-300),
                    CellValue::Bool(false),
                    CellValue::Null,
                    CellValue::Null,
                    CellValue::Text("leading zeros survive".into()),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_types_and_order() {
        let table = mixed_table();
        let decoded = decode_table(&encode_table(&table).unwrap()).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.cell(1, "zipcode"), Some(&CellValue::Text("00501".into())));
    }

    #[test]
    fn test_empty_table_round_trips() {
        let table = Table::new(["year", "pm10"]);
        let decoded = decode_table(&encode_table(&table).unwrap()).unwrap();
        assert_eq!(decoded.columns(), table.columns());
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_non_finite_floats_round_trip() {
        let table = Table::from_rows(
            ["value"],
            vec![
                vec![CellValue::Float(f64::NAN)],
                vec![CellValue::Float(f64::INFINITY)],
                vec![CellValue::Float(f64::NEG_INFINITY)],
                vec![CellValue::Float(-0.0)],
                vec![CellValue::Float(f64::MIN_POSITIVE / 4.0)],
            ],
        )
        .unwrap();

        let bytes = encode_table(&table).unwrap();
        let json = String::from_utf8(bytes.clone()).unwrap();
        assert!(json.contains(r#""value":"NaN""#));
        assert!(json.contains(r#""value":"-inf""#));
        assert!(!json.contains("null"));

        let decoded = decode_table(&bytes).unwrap();
        assert_eq!(decoded, table);
        let bits: Vec<u64> = decoded
            .column("value")
            .unwrap()
            .into_iter()
            .filter_map(CellValue::as_f64)
            .map(f64::to_bits)
            .collect();
        assert!(f64::from_bits(bits[0]).is_nan());
        assert_eq!(&bits[1..], &[
            f64::INFINITY.to_bits(),
            f64::NEG_INFINITY.to_bits(),
            (-0.0f64).to_bits(),
            (f64::MIN_POSITIVE / 4.0).to_bits(),
        ]);
    }

    #[test]
    fn test_unknown_float_spelling_rejected() {
        let payload = br#"{"version":1,"columns":["a"],"rows":[[{"type":"float","value":"Infinity"}]]}"#;
        assert!(matches!(
            decode_table(payload),
            Err(CacheError::SerializationError(_))
        ));
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let err = decode_table(b"\x00\x01not json").unwrap_err();
        assert!(matches!(err, CacheError::SerializationError(_)));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let payload = br#"{"version":99,"columns":["a"],"rows":[]}"#;
        let err = decode_table(payload).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let payload = br#"{"version":1,"columns":["a","b"],"rows":[[{"type":"int","value":1}]]}"#;
        assert!(matches!(
            decode_table(payload),
            Err(CacheError::SerializationError(_))
        ));
    }
}
