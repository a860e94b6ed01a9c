#![allow(clippy::doc_markdown)] // Allow technical terms like memcached, xxh3 in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # statedash
//!
//! Result caching and fan-out fetching for a per-state analytics dashboard.
//!
//! ## Overview
//!
//! Every panel of the dashboard is one slow query against a remote analytics
//! engine. This crate runs those queries concurrently for the selected state,
//! and puts a shared memcached tier in front of them so repeated selections
//! are served from cache. The cache nodes are discovered by resolving one
//! service name, re-resolved every few seconds, and keys are spread across
//! them with rendezvous hashing.
//!
//! The cache is strictly an accelerator: an unreachable node, an empty node
//! set, or an unreadable payload is a cache miss. Only remote query failures
//! reach the caller, attributed to the panel that issued them.
//!
//! ## Module Organization
//!
//! - [`cache`] - Topology discovery, key routing, node clients, get-or-compute
//! - [`orchestrator`] - Concurrent per-panel fetch with join and timing
//! - [`panels`] - The dashboard panels, their queries and view state
//! - [`dashboard`] - Controller wiring the stack to the presentation layer
//! - [`query`] - Remote query engine seam
//! - [`table`] - Tabular result type shared by engine, cache and panels
//! - [`config`] - Layered configuration (TOML file plus environment)
//! - [`resilience`] - Per-node circuit breakers
//! - [`logging`] - Structured logging setup
//! - [`error`] - Errors surfaced to callers
//!
//! ## Quick Start
//!
//! ```rust
//! use statedash::DashboardConfig;
//!
//! let config = DashboardConfig::default();
//! assert_eq!(config.cache.resync_interval_seconds, 10);
//! assert_eq!(config.cache.default_ttl_seconds, 3600);
//! assert_eq!(config.fetch.initial_selection, "California");
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod panels;
pub mod query;
pub mod resilience;
pub mod table;

pub use cache::{
    CacheClient, CacheRouter, CacheStats, CacheTopology, DnsResolver, InMemoryCacheTier,
    NameResolver, NodeSet, ResultCache,
};
pub use config::{ConfigManager, ConfigurationError, DashboardConfig};
pub use dashboard::Dashboard;
pub use error::{DashboardError, DashboardResult, FetchError, PanelError};
pub use orchestrator::{FailurePolicy, FetchOrchestrator, FetchReport};
pub use panels::{DashboardModule, Panel, PanelId, PanelView};
pub use query::{Dialect, QueryEngine, QueryError};
pub use table::{CellValue, Table, TableError};
