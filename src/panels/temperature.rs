//! Daily min/max/average temperatures for one year.

use super::{with_date_columns, DashboardModule, PanelId, UsState, ViewKind};
use crate::table::{CellValue, Table, TableError};
use chrono::{Duration, TimeZone, Utc};

pub const YEAR: i32 = 2016;
const TITLE: &str = "Temperatures (F) in 2016:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemperaturePanel;

impl DashboardModule for TemperaturePanel {
    fn id(&self) -> PanelId {
        PanelId::Temperature
    }

    fn title(&self) -> &'static str {
        TITLE
    }

    fn view_kind(&self) -> ViewKind {
        ViewKind::RangeChart
    }

    fn query(&self, state: &UsState) -> String {
        format!(
            "SELECT year, mo as month, da as day, MAX(max) as max_temp, MIN(min) as min_temp, \
             AVG(temp) as avg_temp, state \
             FROM [bigquery-public-data:noaa_gsod.gsod{YEAR}] a \
             JOIN [bigquery-public-data:noaa_gsod.stations] b \
             ON a.stn=b.usaf AND a.wban=b.wban \
             WHERE state IS NOT NULL AND max < 1000 AND country = 'US' AND state = '{code}' \
             GROUP BY year, month, day, state \
             ORDER BY year, month, day, state",
            code = state.code
        )
    }

    /// Adds `date`, `date_readable` and the half-day `left`/`right` bar
    /// edges, then orders rows by date
    fn postprocess(&self, raw: Table) -> Result<Table, TableError> {
        with_date_columns(raw)?
            .with_column("left", |table, row| day_edge(table, row, -12))?
            .with_column("right", |table, row| day_edge(table, row, 12))?
            .sort_by_column("date")
    }
}

fn day_edge(table: &Table, row: &[CellValue], offset_hours: i64) -> CellValue {
    let Some(date) = table.value(row, "date").and_then(CellValue::as_date) else {
        return CellValue::Null;
    };
    let midnight = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
    CellValue::Timestamp(midnight + Duration::hours(offset_hours))
}
