//! Circuit breaker metrics snapshot.

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};

/// Point-in-time counters for one breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub consecutive_failures: u64,
    /// Calls rejected without touching the node
    pub rejected_count: u64,
    pub current_state: CircuitState,
}

impl CircuitBreakerMetrics {
    /// Failure rate over all recorded calls (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.failure_count as f64 / self.total_calls as f64
        }
    }
}
