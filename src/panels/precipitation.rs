//! Daily average precipitation for one year.

use super::{with_date_columns, DashboardModule, PanelId, UsState, ViewKind};
use crate::table::{Table, TableError};

pub const YEAR: i32 = 2016;
const TITLE: &str = "Precipitation (mm) in 2016:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrecipitationPanel;

impl DashboardModule for PrecipitationPanel {
    fn id(&self) -> PanelId {
        PanelId::Precipitation
    }

    fn title(&self) -> &'static str {
        TITLE
    }

    fn view_kind(&self) -> ViewKind {
        ViewKind::BarChart
    }

    fn query(&self, state: &UsState) -> String {
        format!(
            "SELECT YEAR(date) as year, MONTH(date) as month, DAY(date) as day, AVG(prcp) AS prcp \
             FROM ( \
               SELECT STRING(date) AS date, IF (element = 'PRCP', value/10, NULL) AS prcp \
               FROM [bigquery-public-data:ghcn_d.ghcnd_{YEAR}] AS weather \
               JOIN [bigquery-public-data:ghcn_d.ghcnd_stations] as stations \
               ON weather.id = stations.id \
               WHERE stations.state = '{code}' \
             ) \
             GROUP BY year, month, day \
             ORDER BY year, month, day",
            code = state.code
        )
    }

    fn postprocess(&self, raw: Table) -> Result<Table, TableError> {
        with_date_columns(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::states;
    use crate::table::CellValue;

    #[test]
    fn test_query_targets_year_table() {
        let query = PrecipitationPanel.query(states::lookup("Washington").unwrap());
        assert!(query.contains("ghcnd_2016"));
        assert!(query.contains("stations.state = 'WA'"));
    }

    #[test]
    fn test_invalid_date_parts_become_null() {
        let raw = Table::from_rows(
            ["year", "month", "day", "prcp"],
            vec![
                vec![2016i64.into(), 2i64.into(), 29i64.into(), 3.2f64.into()],
                vec![2016i64.into(), 2i64.into(), 30i64.into(), 0.0f64.into()],
            ],
        )
        .unwrap();

        let table = PrecipitationPanel.postprocess(raw).unwrap();
        assert_eq!(table.cell(0, "date_readable"), Some(&CellValue::Text("2016-02-29".into())));
        assert_eq!(table.cell(1, "date"), Some(&CellValue::Null));
        assert_eq!(table.cell(1, "date_readable"), Some(&CellValue::Null));
        // Row order is left as the engine returned it
        assert_eq!(table.cell(1, "prcp"), Some(&CellValue::Float(0.0)));
    }
}
