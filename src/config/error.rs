//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating [`super::DashboardConfig`].
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A source (file or environment) could not be read or deserialized
    #[error("Failed to load configuration from {source_name}: {error}")]
    Load { source_name: String, error: String },

    /// A value parsed but is outside its allowed range
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },
}

impl ConfigurationError {
    pub fn load(source_name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Load {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            context: context.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::load("config sources", error)
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
