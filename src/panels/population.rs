//! The most populated zipcodes of a state, as a ranked table.

use super::{DashboardModule, PanelId, UsState, ViewKind};
use crate::query::Dialect;
use crate::table::{CellValue, Table, TableError};

pub const ROW_LIMIT: usize = 100;
const TITLE: &str = "Top 100 most populated zipcodes:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationPanel;

impl DashboardModule for PopulationPanel {
    fn id(&self) -> PanelId {
        PanelId::Population
    }

    fn title(&self) -> &'static str {
        TITLE
    }

    fn view_kind(&self) -> ViewKind {
        ViewKind::DataTable
    }

    fn dialect(&self) -> Dialect {
        Dialect::Standard
    }

    fn query(&self, state: &UsState) -> String {
        format!(
            "SELECT A.zipcode, population, city, state_code \
             FROM `bigquery-public-data.census_bureau_usa.population_by_zip_2010` AS A \
             JOIN `bigquery-public-data.utility_us.zipcode_area` AS B \
             ON A.zipcode = B.zipcode \
             WHERE gender = '' AND state_code = '{code}' \
             ORDER BY population DESC \
             LIMIT {ROW_LIMIT}",
            code = state.code
        )
    }

    /// Adds a 1-based `rank` in result order
    fn postprocess(&self, raw: Table) -> Result<Table, TableError> {
        let mut next = 0i64;
        raw.with_column("rank", |_, _| {
            next += 1;
            CellValue::Int(next)
        })
    }

    /// Tables have no plot background to grey out
    fn shades_when_busy(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::states;

    #[test]
    fn test_query_is_standard_sql_with_limit() {
        let query = PopulationPanel.query(states::lookup("Texas").unwrap());
        assert!(query.contains("state_code = 'TX'"));
        assert!(query.ends_with("LIMIT 100"));
        assert_eq!(PopulationPanel.dialect(), Dialect::Standard);
    }

    #[test]
    fn test_rank_is_one_based() {
        let raw = Table::from_rows(
            ["zipcode", "population", "city", "state_code"],
            vec![
                vec!["77449".into(), 115_442i64.into(), "Katy".into(), "TX".into()],
                vec!["78660".into(), 95_940i64.into(), "Pflugerville".into(), "TX".into()],
            ],
        )
        .unwrap();

        let table = PopulationPanel.postprocess(raw).unwrap();
        let ranks: Vec<_> = table.column("rank").unwrap().into_iter().cloned().collect();
        assert_eq!(ranks, vec![CellValue::Int(1), CellValue::Int(2)]);
    }
}
