//! # Circuit Breaker
//!
//! Classic three-state breaker (Closed, Open, HalfOpen) with lock-free state.
//! The cache router consults [`CircuitBreaker::should_allow`] before each node
//! round trip and reports the outcome with [`CircuitBreaker::record_success`]
//! or [`CircuitBreaker::record_failure`].
//!
//! Open-state timing is measured on the tokio clock, so paused-time tests can
//! drive recovery with `tokio::time::advance`.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// All calls go to the node
    Closed = 0,
    /// Calls are rejected without touching the node
    Open = 1,
    /// A limited number of probe calls are let through
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    consecutive_failures: AtomicU64,
    half_open_successes: AtomicU64,
    half_open_admitted: AtomicU64,
    rejected_count: AtomicU64,
}

/// Breaker guarding one cache node
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: AtomicU8,
    config: CircuitBreakerConfig,
    counters: Counters,
    /// Reference point for `opened_at_nanos`
    epoch: Instant,
    /// Nanos since `epoch` when the circuit last opened
    opened_at_nanos: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        debug!(
            component = %name,
            failure_threshold = config.failure_threshold,
            timeout_seconds = config.timeout.as_secs(),
            success_threshold = config.success_threshold,
            "Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            counters: Counters::default(),
            epoch: Instant::now(),
            opened_at_nanos: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Pre-flight check before a node round trip
    ///
    /// An open circuit whose timeout has elapsed moves to half-open and admits
    /// up to `success_threshold` probes.
    pub fn should_allow(&self) -> bool {
        let allowed = match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened = self.opened_at_nanos.load(Ordering::Acquire);
                if self.now_nanos().saturating_sub(opened) >= self.config.timeout.as_nanos() as u64 {
                    self.transition_to_half_open();
                    self.admit_probe()
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => self.admit_probe(),
        };

        if !allowed {
            self.counters.rejected_count.fetch_add(1, Ordering::Relaxed);
        }
        allowed
    }

    pub fn record_success(&self) {
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);
        self.counters.success_count.fetch_add(1, Ordering::Relaxed);

        match self.state() {
            CircuitState::HalfOpen => {
                let successes = self.counters.half_open_successes.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.config.success_threshold as u64 {
                    self.transition_to_closed();
                }
            }
            CircuitState::Closed => {
                self.counters.consecutive_failures.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);
        self.counters.failure_count.fetch_add(1, Ordering::Relaxed);

        match self.state() {
            CircuitState::Closed => {
                let failures = self.counters.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.config.failure_threshold as u64 {
                    self.transition_to_open();
                }
            }
            // A failed probe reopens immediately
            CircuitState::HalfOpen => self.transition_to_open(),
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        self.transition_to_open();
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            total_calls: self.counters.total_calls.load(Ordering::Relaxed),
            success_count: self.counters.success_count.load(Ordering::Relaxed),
            failure_count: self.counters.failure_count.load(Ordering::Relaxed),
            consecutive_failures: self.counters.consecutive_failures.load(Ordering::Relaxed),
            rejected_count: self.counters.rejected_count.load(Ordering::Relaxed),
            current_state: self.state(),
        }
    }

    fn now_nanos(&self) -> u64 {
        Instant::now().duration_since(self.epoch).as_nanos() as u64
    }

    fn admit_probe(&self) -> bool {
        let admitted = self.counters.half_open_admitted.fetch_add(1, Ordering::Relaxed);
        admitted < self.config.success_threshold as u64
    }

    fn reset_half_open(&self) {
        self.counters.half_open_successes.store(0, Ordering::Relaxed);
        self.counters.half_open_admitted.store(0, Ordering::Relaxed);
    }

    fn transition_to_closed(&self) {
        self.counters.consecutive_failures.store(0, Ordering::Relaxed);
        self.reset_half_open();
        self.opened_at_nanos.store(0, Ordering::Release);
        self.state.store(CircuitState::Closed as u8, Ordering::Release);

        info!(component = %self.name, "Circuit breaker closed (node recovered)");
    }

    fn transition_to_open(&self) {
        self.opened_at_nanos.store(self.now_nanos(), Ordering::Release);
        self.reset_half_open();
        self.state.store(CircuitState::Open as u8, Ordering::Release);

        warn!(
            component = %self.name,
            consecutive_failures = self.counters.consecutive_failures.load(Ordering::Relaxed),
            timeout_seconds = self.config.timeout.as_secs(),
            "Circuit breaker opened, skipping node"
        );
    }

    fn transition_to_half_open(&self) {
        // Only the caller that wins the Open -> HalfOpen swap resets the probe counters
        if self
            .state
            .compare_exchange(
                CircuitState::Open as u8,
                CircuitState::HalfOpen as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.reset_half_open();
            info!(component = %self.name, "Circuit breaker half-open (probing node)");
        }
    }
}
