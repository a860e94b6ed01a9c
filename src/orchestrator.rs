//! # Fetch Orchestrator
//!
//! Fans one selection out to every panel, one tokio task per panel, and joins
//! them all before returning. There is no early return: the slowest panel
//! bounds the call, and the wall-clock time of the whole batch is recorded in
//! the [`FetchReport`].
//!
//! Panel failures are attributed to the panel that raised them. What happens
//! next is the [`FailurePolicy`]: keep the other panels' data (`Isolate`), or
//! fail the call with the first failing panel in display order
//! (`AllOrNothing`).

use crate::cache::ResultCache;
use crate::error::{FetchError, PanelError};
use crate::logging::log_fetch_operation;
use crate::panels::{states, DashboardModule, Panel, PanelId, UsState};
use crate::query::QueryEngine;
use crate::table::Table;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// What one failing panel does to the rest of the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Failed panels get an error slot, the others keep their data
    #[default]
    Isolate,
    /// Any failed panel fails the whole call
    AllOrNothing,
}

/// Outcome of one `fetch_all` call
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub batch_id: Uuid,
    pub selection: &'static UsState,
    pub started_at: DateTime<Utc>,
    /// Start of the batch to the last panel completing
    pub elapsed: Duration,
    pub results: BTreeMap<PanelId, Result<Table, PanelError>>,
}

impl FetchReport {
    pub fn table(&self, panel: PanelId) -> Option<&Table> {
        self.results.get(&panel).and_then(|r| r.as_ref().ok())
    }

    pub fn failures(&self) -> Vec<(PanelId, &PanelError)> {
        self.results
            .iter()
            .filter_map(|(panel, result)| result.as_ref().err().map(|e| (*panel, e)))
            .collect()
    }

    /// True when every panel produced a table
    pub fn is_complete(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    pub fn timer_text(&self) -> String {
        format!("(Execution time: {} seconds)", format_seconds(self.elapsed))
    }
}

/// Seconds rounded to four decimals, always with a fractional part
fn format_seconds(elapsed: Duration) -> String {
    let rounded = (elapsed.as_secs_f64() * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}

/// Aborts still-running panel tasks if the joining future is dropped
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct FetchOrchestrator {
    cache: ResultCache,
    engine: Arc<dyn QueryEngine>,
    panels: Vec<Panel>,
    query_timeout: Option<Duration>,
    policy: FailurePolicy,
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("panels", &self.panels)
            .field("query_timeout", &self.query_timeout)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FetchOrchestrator {
    /// Orchestrator over every dashboard panel
    pub fn new(
        cache: ResultCache,
        engine: Arc<dyn QueryEngine>,
        query_timeout: Option<Duration>,
        policy: FailurePolicy,
    ) -> Self {
        Self::with_panels(cache, engine, Panel::all().to_vec(), query_timeout, policy)
    }

    pub fn with_panels(
        cache: ResultCache,
        engine: Arc<dyn QueryEngine>,
        panels: Vec<Panel>,
        query_timeout: Option<Duration>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            cache,
            engine,
            panels,
            query_timeout,
            policy,
        }
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Fetch every panel for `selection` concurrently and join the results
    pub async fn fetch_all(&self, selection: &str) -> Result<FetchReport, FetchError> {
        let state = states::lookup(selection)
            .ok_or_else(|| FetchError::UnknownSelection(selection.to_string()))?;

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        debug!(batch_id = %batch_id, selection = state.name, panels = self.panels.len(), "Starting panel fetch");

        let handles: Vec<(PanelId, JoinHandle<Result<Table, PanelError>>)> = self
            .panels
            .iter()
            .map(|panel| {
                let panel = *panel;
                let cache = self.cache.clone();
                let engine = Arc::clone(&self.engine);
                let query_timeout = self.query_timeout;
                let handle = tokio::spawn(async move {
                    panel
                        .fetch_data(state, &cache, engine.as_ref(), query_timeout)
                        .await
                });
                (panel.id(), handle)
            })
            .collect();
        let _guard = AbortOnDrop(handles.iter().map(|(_, h)| h.abort_handle()).collect());

        let (ids, handles): (Vec<PanelId>, Vec<_>) = handles.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;
        let elapsed = start.elapsed();

        let results: BTreeMap<PanelId, Result<Table, PanelError>> = ids
            .into_iter()
            .zip(joined)
            .map(|(panel, outcome)| {
                let result = outcome
                    .map_err(|e| PanelError::TaskAborted(e.to_string()))
                    .and_then(|r| r);
                if let Err(e) = &result {
                    warn!(batch_id = %batch_id, panel = %panel, error = %e, "Panel fetch failed");
                }
                (panel, result)
            })
            .collect();

        let report = FetchReport {
            batch_id,
            selection: state,
            started_at,
            elapsed,
            results,
        };
        let failures = report.failures();
        log_fetch_operation(batch_id, state.name, report.results.len(), failures.len(), elapsed);

        if self.policy == FailurePolicy::AllOrNothing {
            let first = self
                .panels
                .iter()
                .map(|p| p.id())
                .find_map(|id| failures.iter().find(|(failed, _)| *failed == id).cloned());
            if let Some((panel, source)) = first {
                return Err(FetchError::PanelFailed {
                    panel,
                    source: source.clone(),
                });
            }
        }

        Ok(report)
    }
}
