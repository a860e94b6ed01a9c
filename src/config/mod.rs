//! # Dashboard Configuration
//!
//! Scalar settings consumed by the caching core and the fetch orchestrator.
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration pointed at the in-cluster memcached service.
//!
//! ```toml
//! [cache]
//! service_host = "memcached.default.svc.cluster.local"
//! service_port = 11211
//! resync_interval_seconds = 10
//! default_ttl_seconds = 3600
//!
//! [fetch]
//! failure_policy = "isolate"
//! ```
//!
//! Loading and environment overrides live in [`loader`].

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::orchestrator::FailurePolicy;
use crate::panels::states;
use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest relative expiry memcached accepts; larger values are read as a unix timestamp.
pub const MAX_RELATIVE_TTL_SECONDS: u64 = 60 * 60 * 24 * 30;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub cache: CacheConfig,
    pub query: QueryConfig,
    pub fetch: FetchConfig,
}

impl DashboardConfig {
    /// Validate all sections
    pub fn validate(&self) -> ConfigResult<()> {
        self.cache.validate()?;
        self.fetch.validate()?;
        Ok(())
    }
}

/// Which node client the cache router builds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    Memcached,
    /// Process-local tier, for development and tests
    Memory,
}

/// Cache tier and topology discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false the dashboard always computes and never touches the cache tier
    pub enabled: bool,
    pub backend: CacheBackendKind,
    /// Logical service name resolved on every resync
    pub service_host: String,
    pub service_port: u16,
    pub resync_interval_seconds: u64,
    pub default_ttl_seconds: u64,
    /// Bound on a single node round trip (get or set)
    pub operation_timeout_ms: u64,
    pub circuit_breaker: CacheCircuitBreakerConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memcached,
            service_host: "memcached.default.svc.cluster.local".to_string(),
            service_port: 11211,
            resync_interval_seconds: 10,
            default_ttl_seconds: 3600,
            operation_timeout_ms: 500,
            circuit_breaker: CacheCircuitBreakerConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_seconds)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.service_host.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "cache.service_host",
                &self.service_host,
                "must not be empty",
            ));
        }
        if self.service_port == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.service_port",
                self.service_port,
                "must be greater than 0",
            ));
        }
        if self.resync_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.resync_interval_seconds",
                self.resync_interval_seconds,
                "must be greater than 0",
            ));
        }
        if self.default_ttl_seconds == 0 || self.default_ttl_seconds > MAX_RELATIVE_TTL_SECONDS {
            return Err(ConfigurationError::invalid_value(
                "cache.default_ttl_seconds",
                self.default_ttl_seconds,
                format!("must be between 1 and {MAX_RELATIVE_TTL_SECONDS}"),
            ));
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.operation_timeout_ms",
                self.operation_timeout_ms,
                "must be greater than 0",
            ));
        }
        if self.circuit_breaker.enabled {
            self.circuit_breaker
                .to_breaker_config()
                .validate()
                .map_err(|reason| {
                    ConfigurationError::invalid_value("cache.circuit_breaker", "{..}", reason)
                })?;
        }
        Ok(())
    }
}

/// Per-node circuit breaker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheCircuitBreakerConfig {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
    pub success_threshold: u32,
}

impl Default for CacheCircuitBreakerConfig {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            enabled: true,
            failure_threshold: defaults.failure_threshold,
            timeout_seconds: defaults.timeout.as_secs(),
            success_threshold: defaults.success_threshold,
        }
    }
}

impl CacheCircuitBreakerConfig {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: Duration::from_secs(self.timeout_seconds),
            success_threshold: self.success_threshold,
        }
    }
}

/// Remote query engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Bound on a single panel's remote compute; 0 disables the bound
    pub timeout_seconds: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

/// Fan-out fetch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub failure_policy: FailurePolicy,
    /// Selection shown when the dashboard first loads
    pub initial_selection: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Isolate,
            initial_selection: "California".to_string(),
        }
    }
}

impl FetchConfig {
    fn validate(&self) -> ConfigResult<()> {
        if states::lookup(&self.initial_selection).is_none() {
            return Err(ConfigurationError::invalid_value(
                "fetch.initial_selection",
                &self.initial_selection,
                "not a known state name",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.service_port, 11211);
        assert_eq!(config.cache.resync_interval(), Duration::from_secs(10));
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.fetch.failure_policy, FailurePolicy::Isolate);
    }

    #[test]
    fn test_zero_resync_interval_rejected() {
        let mut config = DashboardConfig::default();
        config.cache.resync_interval_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache.resync_interval_seconds"));
    }

    #[test]
    fn test_ttl_above_relative_limit_rejected() {
        let mut config = DashboardConfig::default();
        config.cache.default_ttl_seconds = MAX_RELATIVE_TTL_SECONDS + 1;
        assert!(config.validate().is_err());

        config.cache.default_ttl_seconds = MAX_RELATIVE_TTL_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_initial_selection_rejected() {
        let mut config = DashboardConfig::default();
        config.fetch.initial_selection = "Atlantis".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Atlantis"));
    }

    #[test]
    fn test_invalid_breaker_only_checked_when_enabled() {
        let mut config = DashboardConfig::default();
        config.cache.circuit_breaker.failure_threshold = 0;
        assert!(config.validate().is_err());

        config.cache.circuit_breaker.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_query_timeout_zero_disables() {
        let config = QueryConfig { timeout_seconds: 0 };
        assert_eq!(config.timeout(), None);
        assert_eq!(
            QueryConfig::default().timeout(),
            Some(Duration::from_secs(120))
        );
    }
}
