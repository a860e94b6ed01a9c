//! proptest strategies for cache keys, node sets and tables

use chrono::{DateTime, NaiveDate};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use statedash::{CellValue, Table};
use std::net::SocketAddr;

/// Keys shaped like panel cache keys
pub fn cache_key_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{3,13}", "[A-Z]{2}").prop_map(|(panel, code)| format!("{panel}-{code}"))
}

/// Between 1 and 12 distinct node addresses
pub fn node_set_strategy() -> impl Strategy<Value = Vec<SocketAddr>> {
    btree_set((any::<[u8; 4]>(), 1024u16..65535), 1..12).prop_map(|nodes| {
        nodes
            .into_iter()
            .map(|(ip, port)| SocketAddr::from((ip, port)))
            .collect()
    })
}

pub fn cell_strategy() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Null),
        any::<bool>().prop_map(CellValue::Bool),
        any::<i64>().prop_map(CellValue::Int),
        any::<f64>().prop_map(CellValue::Float),
        prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(-0.0),
            prop::num::f64::SUBNORMAL,
        ]
        .prop_map(CellValue::Float),
        "[ -~]{0,24}".prop_map(CellValue::Text),
        (1900i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Null)
        }),
        (-2_208_988_800i64..4_102_444_800, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
            DateTime::from_timestamp(secs, nanos)
                .map(CellValue::Timestamp)
                .unwrap_or(CellValue::Null)
        }),
    ]
}

/// Rectangular tables with up to 6 columns and 20 rows
pub fn table_strategy() -> impl Strategy<Value = Table> {
    (1usize..6).prop_flat_map(|width| {
        vec(vec(cell_strategy(), width), 0..20).prop_map(move |rows| {
            let columns: Vec<String> = (0..width).map(|i| format!("col_{i}")).collect();
            Table::from_rows(columns, rows).expect("rows are generated at table width")
        })
    })
}
