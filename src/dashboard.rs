//! Dashboard controller.
//!
//! Owns the whole stack (topology, cache client, result cache, orchestrator)
//! and the per-panel view state the presentation layer renders. The UI calls
//! [`Dashboard::load`] once and [`Dashboard::on_input_changed`] whenever the
//! selected state changes.

use crate::cache::{CacheClient, DnsResolver, InMemoryCacheTier, NameResolver, ResultCache};
use crate::config::DashboardConfig;
use crate::error::{DashboardResult, FetchError, PanelError};
use crate::orchestrator::{FetchOrchestrator, FetchReport};
use crate::panels::{DashboardModule, Panel, PanelId, PanelView};
use crate::query::QueryEngine;
use crate::table::Table;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Dashboard {
    orchestrator: FetchOrchestrator,
    selection: String,
    views: BTreeMap<PanelId, PanelView>,
    timer_text: String,
    last_report: Option<FetchReport>,
}

impl Dashboard {
    /// Build the stack from configuration, resolving cache nodes over DNS
    pub fn bootstrap(config: &DashboardConfig, engine: Arc<dyn QueryEngine>) -> DashboardResult<Self> {
        Self::bootstrap_with(config, engine, Arc::new(DnsResolver), None)
    }

    /// Build the stack with an explicit resolver and, for the `memory`
    /// backend, a shared in-process tier
    pub fn bootstrap_with(
        config: &DashboardConfig,
        engine: Arc<dyn QueryEngine>,
        resolver: Arc<dyn NameResolver>,
        memory_tier: Option<Arc<InMemoryCacheTier>>,
    ) -> DashboardResult<Self> {
        config.validate()?;

        let client = CacheClient::from_config(&config.cache, resolver, memory_tier);
        let cache = ResultCache::new(Arc::new(client), config.cache.default_ttl());
        let orchestrator = FetchOrchestrator::new(
            cache,
            engine,
            config.query.timeout(),
            config.fetch.failure_policy,
        );

        info!(
            cache_enabled = config.cache.enabled,
            policy = ?config.fetch.failure_policy,
            initial_selection = %config.fetch.initial_selection,
            "Dashboard bootstrapped"
        );

        Ok(Self {
            orchestrator,
            selection: config.fetch.initial_selection.clone(),
            views: BTreeMap::new(),
            timer_text: String::new(),
            last_report: None,
        })
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    pub fn selection(&self) -> &str {
        &self.selection
    }

    pub fn views(&self) -> &BTreeMap<PanelId, PanelView> {
        &self.views
    }

    pub fn view(&self, panel: PanelId) -> Option<&PanelView> {
        self.views.get(&panel)
    }

    pub fn timer_text(&self) -> &str {
        &self.timer_text
    }

    /// Report of the most recent successful fetch
    pub fn last_report(&self) -> Option<&FetchReport> {
        self.last_report.as_ref()
    }

    /// First fetch for the configured selection; builds every view
    pub async fn load(&mut self) -> DashboardResult<&FetchReport> {
        let selection = self.selection.clone();
        self.load_selection(&selection).await
    }

    /// Build every view from a fetch of `selection`
    pub async fn load_selection(&mut self, selection: &str) -> DashboardResult<&FetchReport> {
        let report = self.orchestrator.fetch_all(selection).await?;

        self.views = self
            .orchestrator
            .panels()
            .iter()
            .map(|panel| {
                let view = match report.results.get(&panel.id()) {
                    Some(Ok(table)) => panel.make_view(table.clone()),
                    Some(Err(e)) => failed_view(panel, e),
                    None => failed_view(panel, &missing(panel.id())),
                };
                (panel.id(), view)
            })
            .collect();
        self.selection = selection.to_string();
        self.timer_text = report.timer_text();

        Ok(self.store(report))
    }

    /// Refresh every view for a newly selected value
    ///
    /// Views are busy for the duration of the fetch. A failing panel shows
    /// its error in place of its plot; under all-or-nothing the failing panel
    /// shows the error and the others keep their previous data.
    pub async fn on_input_changed(&mut self, value: &str) -> DashboardResult<&FetchReport> {
        if self.views.is_empty() {
            return self.load_selection(value).await;
        }

        let panels = self.orchestrator.panels().to_vec();
        self.timer_text = format!("(Executing {} queries...)", panels.len());
        for panel in &panels {
            if let Some(view) = self.views.get_mut(&panel.id()) {
                panel.set_busy(view);
            }
        }

        let outcome = self.orchestrator.fetch_all(value).await;

        let report = match outcome {
            Ok(report) => {
                for panel in &panels {
                    let Some(view) = self.views.get_mut(&panel.id()) else {
                        continue;
                    };
                    match report.results.get(&panel.id()) {
                        Some(Ok(table)) => panel.update_view(view, table.clone()),
                        Some(Err(e)) => panel.show_error(view, e),
                        None => panel.show_error(view, &missing(panel.id())),
                    }
                }
                self.selection = value.to_string();
                self.timer_text = report.timer_text();
                Ok(report)
            }
            Err(e) => {
                warn!(selection = value, error = %e, "Dashboard refresh failed");
                if let FetchError::PanelFailed { panel, source } = &e {
                    if let Some(view) = self.views.get_mut(panel) {
                        Panel::from_id(*panel).show_error(view, source);
                    }
                }
                self.timer_text.clear();
                Err(e)
            }
        };

        for panel in &panels {
            if let Some(view) = self.views.get_mut(&panel.id()) {
                panel.set_idle(view);
            }
        }

        Ok(self.store(report?))
    }

    fn store(&mut self, report: FetchReport) -> &FetchReport {
        self.last_report.insert(report)
    }
}

fn failed_view(panel: &Panel, error: &PanelError) -> PanelView {
    let mut view = panel.make_view(Table::default());
    panel.show_error(&mut view, error);
    view
}

fn missing(panel: PanelId) -> PanelError {
    PanelError::TaskAborted(format!("no result for panel {panel}"))
}
