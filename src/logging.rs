//! # Structured Logging Module
//!
//! Environment-aware console logging for the dashboard core. Output goes to
//! stdout so container log collectors pick it up; set
//! `STATEDASH_LOG_FORMAT=json` for one JSON object per line.
//!
//! Levels default by environment (`STATEDASH_ENV`, then `APP_ENV`):
//! `test`/`development` log at debug, `production` at info. `RUST_LOG`
//! overrides both.

use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process
///
/// Safe to call repeatedly and safe to call when another subscriber is
/// already installed (the existing one wins).
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json = std::env::var("STATEDASH_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json {
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(false)
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(std::io::stdout().is_terminal())
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(
            environment = %environment,
            json = json,
            "Structured logging initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("STATEDASH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log one completed fan-out fetch
pub fn log_fetch_operation(
    batch_id: Uuid,
    selection: &str,
    panel_count: usize,
    failed: usize,
    elapsed: Duration,
) {
    tracing::info!(
        batch_id = %batch_id,
        selection = %selection,
        panel_count = panel_count,
        failed = failed,
        duration_ms = elapsed.as_millis() as u64,
        timestamp = %Utc::now().to_rfc3339(),
        "FETCH_OPERATION"
    );
}

/// Log a node-set change observed during a topology resync
pub fn log_topology_change(service: &str, previous_nodes: usize, nodes: usize, generation: u64) {
    tracing::info!(
        service = %service,
        previous_nodes = previous_nodes,
        nodes = nodes,
        generation = generation,
        degraded = nodes == 0,
        timestamp = %Utc::now().to_rfc3339(),
        "TOPOLOGY_CHANGE"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_environment() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("staging"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_topology_change("memcached:11211", 0, 2, 1);
        log_fetch_operation(Uuid::new_v4(), "California", 4, 0, Duration::from_millis(12));
    }
}
