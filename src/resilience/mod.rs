//! # Cache Node Resilience
//!
//! Per-node circuit breakers for the cache tier. A node that keeps failing
//! is skipped (reads become misses, writes are dropped) until its open
//! timeout elapses, so a dead node costs one timeout per breaker cycle
//! instead of one per request.

pub mod circuit_breaker;
pub mod config;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use config::CircuitBreakerConfig;
pub use metrics::CircuitBreakerMetrics;
