//! Yearly air pollutant averages for the selected state.

use super::{DashboardModule, PanelId, UsState, ViewKind};

const TITLE: &str = "Evolution of air pollutant levels:";

/// Series drawn against `year`, with their legend labels
pub const SERIES: [(&str, &str); 4] = [
    ("pm10", "PM10 Mass (µg/m³)"),
    ("pm25_frm", "PM2.5 FRM (µg/m³)"),
    ("pm25_nonfrm", "PM2.5 non FRM (µg/m³)"),
    ("lead", "Lead (¹/₁₀₀ µg/m³)"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AirPanel;

fn pollutant_average(table: &str, state_name: &str, scale: &str) -> String {
    format!(
        "SELECT avg(arithmetic_mean){scale} as avg, YEAR(date_local) as year \
         FROM [bigquery-public-data:epa_historical_air_quality.{table}] \
         WHERE state_name = '{state_name}' \
         GROUP BY year"
    )
}

impl DashboardModule for AirPanel {
    fn id(&self) -> PanelId {
        PanelId::Air
    }

    fn title(&self) -> &'static str {
        TITLE
    }

    fn view_kind(&self) -> ViewKind {
        ViewKind::LineChart { x: "year" }
    }

    /// The EPA tables are keyed by state name, not code
    fn query(&self, state: &UsState) -> String {
        let name = state.name;
        format!(
            "SELECT pm10.year AS year, pm10.avg AS pm10, pm25_frm.avg AS pm25_frm, \
             pm25_nonfrm.avg AS pm25_nonfrm, lead.avg AS lead \
             FROM ({pm10}) AS pm10 \
             JOIN ({pm25_frm}) AS pm25_frm ON pm10.year = pm25_frm.year \
             JOIN ({pm25_nonfrm}) AS pm25_nonfrm ON pm10.year = pm25_nonfrm.year \
             JOIN ({lead}) AS lead ON pm10.year = lead.year \
             ORDER BY year",
            pm10 = pollutant_average("pm10_daily_summary", name, ""),
            pm25_frm = pollutant_average("pm25_frm_daily_summary", name, ""),
            pm25_nonfrm = pollutant_average("pm25_nonfrm_daily_summary", name, ""),
            lead = pollutant_average("lead_daily_summary", name, " * 100"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::states;
    use crate::query::Dialect;

    #[test]
    fn test_query_filters_by_state_name() {
        let state = states::lookup("New York").unwrap();
        let query = AirPanel.query(state);
        assert_eq!(query.matches("state_name = 'New York'").count(), 4);
        assert!(query.contains("avg(arithmetic_mean) * 100 as avg"));
        assert!(!query.contains("'NY'"));
    }

    #[test]
    fn test_key_uses_code_even_though_query_uses_name() {
        let state = states::lookup("New York").unwrap();
        assert_eq!(AirPanel.cache_key(state), "air-NY");
        assert_eq!(AirPanel.dialect(), Dialect::Legacy);
    }
}
