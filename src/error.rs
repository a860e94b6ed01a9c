//! Error types surfaced to callers of the dashboard core.
//!
//! Cache-layer failures never appear here; they are absorbed as misses inside
//! [`crate::cache`]. What remains is remote compute failure, attributed to a
//! panel, plus configuration and selection errors.

use crate::config::ConfigurationError;
use crate::panels::PanelId;
use crate::query::QueryError;
use crate::table::TableError;
use thiserror::Error;

/// Why one panel has no data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PanelError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Result post-processing failed: {0}")]
    Postprocess(#[from] TableError),

    /// The panel's task panicked or was cancelled
    #[error("Panel task did not complete: {0}")]
    TaskAborted(String),
}

/// Failure of a whole `fetch_all` call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Unknown selection '{0}'")]
    UnknownSelection(String),

    #[error("Panel '{panel}' failed: {source}")]
    PanelFailed { panel: PanelId, source: PanelError },
}

impl FetchError {
    /// Panel the failure is attributed to, if any
    pub fn panel(&self) -> Option<PanelId> {
        match self {
            FetchError::PanelFailed { panel, .. } => Some(*panel),
            FetchError::UnknownSelection(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type DashboardResult<T> = Result<T, DashboardError>;
