//! Cache error types
//!
//! None of these escape the cache layer: reads that fail become misses and
//! writes that fail are logged and dropped.

use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Failed to connect to a cache node
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// Failed to serialize or deserialize a cached table
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// Node round trip exceeded the operation timeout
    #[error("Cache operation timed out: {0}")]
    Timeout(String),

    /// Key rejected before it reached the wire
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Node returned an error
    #[error("Cache backend error: {0}")]
    BackendError(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
