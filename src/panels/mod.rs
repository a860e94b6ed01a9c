//! # Dashboard Panels
//!
//! The fixed set of panels, each one query against the remote engine plus
//! the view state the presentation layer renders. Every panel implements
//! [`DashboardModule`]; the [`Panel`] enum dispatches to them statically.
//!
//! Cached entries hold the raw query result. Derived columns (dates, ranks)
//! are recomputed by [`DashboardModule::postprocess`] after every fetch, so
//! a change to post-processing never needs a cache flush.

pub mod air;
pub mod population;
pub mod precipitation;
pub mod states;
pub mod temperature;

pub use air::AirPanel;
pub use population::PopulationPanel;
pub use precipitation::PrecipitationPanel;
pub use states::UsState;
pub use temperature::TemperaturePanel;

use crate::cache::ResultCache;
use crate::error::PanelError;
use crate::query::{execute_with_timeout, Dialect, QueryEngine};
use crate::table::{CellValue, Table, TableError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Title shown while a panel is refreshing
pub const BUSY_TITLE: &str = "Updating...";

/// Stable panel identifier, also the cache-key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelId {
    Air,
    Temperature,
    Population,
    Precipitation,
}

impl PanelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelId::Air => "air",
            PanelId::Temperature => "temperature",
            PanelId::Population => "population",
            PanelId::Precipitation => "precipitation",
        }
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the presentation layer draws a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// One line per series over `x`
    LineChart { x: &'static str },
    /// Min/max band plus an average line over dates
    RangeChart,
    BarChart,
    DataTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Background {
    Normal,
    /// Greyed out while busy
    Shaded,
}

/// Render state of one panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub panel: PanelId,
    pub kind: ViewKind,
    pub title: String,
    pub busy: bool,
    pub background: Background,
    /// Data currently drawn; `None` while an error is shown instead
    pub data: Option<Table>,
    pub error: Option<String>,
}

impl PanelView {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Capabilities every panel provides
pub trait DashboardModule {
    fn id(&self) -> PanelId;

    /// Title shown when idle
    fn title(&self) -> &'static str;

    fn view_kind(&self) -> ViewKind;

    fn query(&self, state: &UsState) -> String;

    fn dialect(&self) -> Dialect {
        Dialect::Legacy
    }

    /// Deterministic per (panel, selection)
    fn cache_key(&self, state: &UsState) -> String {
        format!("{}-{}", self.id(), state.code)
    }

    /// Derive presentation columns from the raw (cached) result
    fn postprocess(&self, raw: Table) -> Result<Table, TableError> {
        Ok(raw)
    }

    /// Whether the plot background is greyed while busy
    fn shades_when_busy(&self) -> bool {
        true
    }

    fn make_view(&self, table: Table) -> PanelView {
        PanelView {
            panel: self.id(),
            kind: self.view_kind(),
            title: self.title().to_string(),
            busy: false,
            background: Background::Normal,
            data: Some(table),
            error: None,
        }
    }

    fn update_view(&self, view: &mut PanelView, table: Table) {
        view.data = Some(table);
        view.error = None;
    }

    /// Replace the plot with the failure message
    fn show_error(&self, view: &mut PanelView, error: &PanelError) {
        view.data = None;
        view.error = Some(error.to_string());
    }

    fn set_busy(&self, view: &mut PanelView) {
        view.busy = true;
        view.title = BUSY_TITLE.to_string();
        if self.shades_when_busy() {
            view.background = Background::Shaded;
        }
    }

    fn set_idle(&self, view: &mut PanelView) {
        view.busy = false;
        view.title = self.title().to_string();
        view.background = Background::Normal;
    }
}

/// Closed set of dashboard panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Air(AirPanel),
    Temperature(TemperaturePanel),
    Population(PopulationPanel),
    Precipitation(PrecipitationPanel),
}

macro_rules! dispatch {
    ($self:expr, $panel:ident => $body:expr) => {
        match $self {
            Panel::Air($panel) => $body,
            Panel::Temperature($panel) => $body,
            Panel::Population($panel) => $body,
            Panel::Precipitation($panel) => $body,
        }
    };
}

impl Panel {
    /// Every panel, in display order
    pub fn all() -> [Panel; 4] {
        [
            Panel::Air(AirPanel),
            Panel::Temperature(TemperaturePanel),
            Panel::Population(PopulationPanel),
            Panel::Precipitation(PrecipitationPanel),
        ]
    }

    pub fn from_id(id: PanelId) -> Panel {
        match id {
            PanelId::Air => Panel::Air(AirPanel),
            PanelId::Temperature => Panel::Temperature(TemperaturePanel),
            PanelId::Population => Panel::Population(PopulationPanel),
            PanelId::Precipitation => Panel::Precipitation(PrecipitationPanel),
        }
    }

    /// Query (through the result cache) and post-process this panel's data
    pub async fn fetch_data(
        &self,
        state: &UsState,
        cache: &ResultCache,
        engine: &dyn QueryEngine,
        query_timeout: Option<Duration>,
    ) -> Result<Table, PanelError> {
        let key = self.cache_key(state);
        let query = self.query(state);
        let dialect = self.dialect();

        debug!(panel = %self.id(), key = %key, dialect = %dialect, "Fetching panel data");
        let raw = cache
            .get_or_compute(&key, cache.default_ttl(), || {
                execute_with_timeout(engine, &query, dialect, query_timeout)
            })
            .await?;

        Ok(self.postprocess(raw)?)
    }
}

/// Append `date` and `date_readable` built from the year/month/day columns
///
/// Parts may arrive as integers or as numeric text; rows whose parts do not
/// form a calendar date get nulls.
pub(crate) fn with_date_columns(raw: Table) -> Result<Table, TableError> {
    for column in ["year", "month", "day"] {
        if raw.column_index(column).is_none() {
            return Err(TableError::UnknownColumn(column.to_string()));
        }
    }

    raw.with_column("date", |table, row| {
        let part = |name: &str| table.value(row, name).and_then(integer_part);
        match (part("year"), part("month"), part("day")) {
            (Some(y), Some(m), Some(d)) => CellValue::date_from_parts(y, m, d),
            _ => CellValue::Null,
        }
    })?
    .with_column("date_readable", |table, row| {
        match table.value(row, "date").and_then(CellValue::as_date) {
            Some(date) => CellValue::Text(date.format("%Y-%m-%d").to_string()),
            None => CellValue::Null,
        }
    })
}

fn integer_part(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Int(v) => Some(*v),
        CellValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
        CellValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl DashboardModule for Panel {
    fn id(&self) -> PanelId {
        dispatch!(self, p => p.id())
    }

    fn title(&self) -> &'static str {
        dispatch!(self, p => p.title())
    }

    fn view_kind(&self) -> ViewKind {
        dispatch!(self, p => p.view_kind())
    }

    fn query(&self, state: &UsState) -> String {
        dispatch!(self, p => p.query(state))
    }

    fn dialect(&self) -> Dialect {
        dispatch!(self, p => p.dialect())
    }

    fn cache_key(&self, state: &UsState) -> String {
        dispatch!(self, p => p.cache_key(state))
    }

    fn postprocess(&self, raw: Table) -> Result<Table, TableError> {
        dispatch!(self, p => p.postprocess(raw))
    }

    fn shades_when_busy(&self) -> bool {
        dispatch!(self, p => p.shades_when_busy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryError;

    fn california() -> &'static UsState {
        states::lookup("California").unwrap()
    }

    #[test]
    fn test_cache_keys_are_panel_and_state_code() {
        let keys: Vec<String> = Panel::all()
            .iter()
            .map(|p| p.cache_key(california()))
            .collect();
        assert_eq!(
            keys,
            vec!["air-CA", "temperature-CA", "population-CA", "precipitation-CA"]
        );
    }

    #[test]
    fn test_from_id_round_trips() {
        for panel in Panel::all() {
            assert_eq!(Panel::from_id(panel.id()), panel);
        }
    }

    #[test]
    fn test_only_population_uses_standard_dialect() {
        for panel in Panel::all() {
            let expected = if panel.id() == PanelId::Population {
                Dialect::Standard
            } else {
                Dialect::Legacy
            };
            assert_eq!(panel.dialect(), expected, "{}", panel.id());
        }
    }

    #[test]
    fn test_busy_idle_cycle_restores_title() {
        let panel = Panel::from_id(PanelId::Precipitation);
        let mut view = panel.make_view(Table::new(["prcp"]));

        panel.set_busy(&mut view);
        assert!(view.busy);
        assert_eq!(view.title, BUSY_TITLE);
        assert_eq!(view.background, Background::Shaded);

        panel.set_idle(&mut view);
        assert!(!view.busy);
        assert_eq!(view.title, "Precipitation (mm) in 2016:");
        assert_eq!(view.background, Background::Normal);
    }

    #[test]
    fn test_population_table_is_not_shaded() {
        let panel = Panel::from_id(PanelId::Population);
        let mut view = panel.make_view(Table::new(["zipcode"]));
        panel.set_busy(&mut view);
        assert_eq!(view.background, Background::Normal);
        assert_eq!(view.title, BUSY_TITLE);
    }

    #[test]
    fn test_error_replaces_data_until_next_update() {
        let panel = Panel::from_id(PanelId::Air);
        let mut view = panel.make_view(Table::new(["year"]));

        panel.show_error(
            &mut view,
            &PanelError::Query(QueryError::Engine("backend unavailable".into())),
        );
        assert!(view.data.is_none());
        assert_eq!(
            view.error.as_deref(),
            Some("Query engine error: backend unavailable")
        );

        panel.update_view(&mut view, Table::new(["year"]));
        assert!(!view.has_error());
        assert!(view.data.is_some());
    }
}
