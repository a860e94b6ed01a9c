//! Configuration Loader
//!
//! Layers an optional TOML file under `STATEDASH__`-prefixed environment
//! variables and validates the result. Nested keys use a double underscore:
//! `STATEDASH__CACHE__SERVICE_HOST=memcached.staging.svc.cluster.local`.

use super::error::{ConfigResult, ConfigurationError};
use super::DashboardConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_PATH_VAR: &str = "STATEDASH_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/statedash.toml";
const ENV_PREFIX: &str = "STATEDASH";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: DashboardConfig,
    environment: String,
    source_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    ///
    /// The file path comes from `STATEDASH_CONFIG_PATH`, falling back to
    /// `config/statedash.toml`. A missing file is not an error.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let path = env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_path(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_env(path, None)
    }

    /// Load from `path` with an explicit override map instead of the process
    /// environment. Keys look like `STATEDASH__CACHE__SERVICE_PORT`.
    pub fn load_with_env(
        path: &Path,
        overrides: Option<config::Map<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        debug!(
            environment = %environment,
            path = %path.display(),
            "Loading dashboard configuration"
        );

        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(overrides),
            )
            .build()
            .map_err(|e| ConfigurationError::load(path.display().to_string(), e))?;

        let config: DashboardConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::load(path.display().to_string(), e))?;

        config.validate()?;

        info!(
            environment = %environment,
            cache_enabled = config.cache.enabled,
            cache_service = %format!("{}:{}", config.cache.service_host, config.cache.service_port),
            resync_interval_seconds = config.cache.resync_interval_seconds,
            failure_policy = ?config.fetch.failure_policy,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source_path: path.to_path_buf(),
        }))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Detect the deployment environment from environment variables
    pub fn detect_environment() -> String {
        env::var("STATEDASH_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}
