//! # Cache Router
//!
//! Routes each key to one owning node of a [`NodeSet`] with rendezvous
//! (highest-random-weight) hashing: every node scores the key with xxh3
//! seeded by the node address, the highest score owns it. Adding or removing
//! a node only moves the keys that node wins or owned.
//!
//! Every operation is best effort. Transport errors on `get` read as a miss,
//! errors on `set` are logged and dropped, and an empty node set turns both
//! into no-ops.

use super::errors::CacheError;
use super::providers::{NodeClient, NodeConnector};
use super::topology::NodeSet;
use super::traits::CacheService;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

#[derive(Debug, Clone)]
struct NodeSlot {
    addr: SocketAddr,
    seed: u64,
    client: NodeClient,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl NodeSlot {
    fn allow(&self) -> bool {
        self.breaker.as_ref().map_or(true, |b| b.should_allow())
    }

    fn record(&self, outcome: Result<(), &CacheError>) {
        let Some(breaker) = &self.breaker else {
            return;
        };
        match outcome {
            Ok(()) => breaker.record_success(),
            // Rejected before the wire, says nothing about the node
            Err(CacheError::InvalidKey(_)) => {}
            Err(_) => breaker.record_failure(),
        }
    }
}

/// Health of one routed node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeHealth {
    pub addr: SocketAddr,
    pub provider: &'static str,
    pub healthy: bool,
    pub circuit: Option<CircuitState>,
    /// Breaker counters, `None` when breakers are disabled
    pub breaker: Option<CircuitBreakerMetrics>,
}

/// Key router built from one node-set snapshot
#[derive(Debug, Clone)]
pub struct CacheRouter {
    nodes: Arc<NodeSet>,
    generation: u64,
    slots: Vec<NodeSlot>,
}

impl CacheRouter {
    /// Router over no nodes: every `get` misses, every `set` is dropped
    pub fn empty() -> Self {
        Self {
            nodes: Arc::new(NodeSet::empty()),
            generation: 0,
            slots: Vec::new(),
        }
    }

    /// Build a router for `nodes`
    ///
    /// Clients and breakers for addresses that were already routed by
    /// `previous` are carried over, so open connections and breaker state
    /// survive a topology change.
    pub fn build(
        nodes: Arc<NodeSet>,
        generation: u64,
        connector: &NodeConnector,
        breaker_config: Option<&CircuitBreakerConfig>,
        previous: Option<&CacheRouter>,
    ) -> Self {
        let slots = nodes
            .iter()
            .map(|addr| {
                if let Some(existing) = previous.and_then(|p| p.slot(addr)) {
                    return existing.clone();
                }
                NodeSlot {
                    addr: *addr,
                    seed: node_seed(addr),
                    client: connector.connect(*addr),
                    breaker: breaker_config.map(|config| {
                        Arc::new(CircuitBreaker::new(format!("cache-node-{addr}"), config.clone()))
                    }),
                }
            })
            .collect();

        debug!(
            nodes = %nodes,
            generation = generation,
            backend = connector.backend_name(),
            "Cache router built"
        );

        Self {
            nodes,
            generation,
            slots,
        }
    }

    pub fn nodes(&self) -> &Arc<NodeSet> {
        &self.nodes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True when there is no node to route to
    pub fn is_degraded(&self) -> bool {
        self.slots.is_empty()
    }

    /// Node that owns `key`, `None` in degraded mode
    pub fn owner_of(&self, key: &str) -> Option<SocketAddr> {
        self.route(key).map(|slot| slot.addr)
    }

    /// Fetch `key` from its owner; any failure reads as a miss
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let slot = self.route(key)?;
        if !slot.allow() {
            debug!(node = %slot.addr, key = key, "Circuit open, treating GET as miss");
            return None;
        }

        match slot.client.get(key).await {
            Ok(value) => {
                slot.record(Ok(()));
                value
            }
            Err(e) => {
                slot.record(Err(&e));
                warn!(node = %slot.addr, key = key, error = %e, "Cache GET failed, treating as miss");
                None
            }
        }
    }

    /// Store `value` on the owner of `key`
    ///
    /// Returns whether a node acknowledged the write. Failures are logged here
    /// and never surface as errors.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> bool {
        let Some(slot) = self.route(key) else {
            return false;
        };
        if !slot.allow() {
            debug!(node = %slot.addr, key = key, "Circuit open, skipping SET");
            return false;
        }

        match slot.client.set(key, value, ttl).await {
            Ok(()) => {
                slot.record(Ok(()));
                true
            }
            Err(e) => {
                slot.record(Err(&e));
                warn!(node = %slot.addr, key = key, error = %e, "Cache SET failed, dropping write");
                false
            }
        }
    }

    /// Health-check every routed node concurrently
    pub async fn health(&self) -> Vec<NodeHealth> {
        let checks = self.slots.iter().map(|slot| async move {
            let healthy = slot.client.health_check().await.unwrap_or(false);
            NodeHealth {
                addr: slot.addr,
                provider: slot.client.provider_name(),
                healthy,
                circuit: slot.breaker.as_ref().map(|b| b.state()),
                breaker: slot.breaker.as_ref().map(|b| b.metrics()),
            }
        });
        futures::future::join_all(checks).await
    }

    fn slot(&self, addr: &SocketAddr) -> Option<&NodeSlot> {
        self.slots.iter().find(|slot| slot.addr == *addr)
    }

    fn route(&self, key: &str) -> Option<&NodeSlot> {
        self.slots
            .iter()
            .max_by_key(|slot| (xxh3_64_with_seed(key.as_bytes(), slot.seed), slot.addr))
    }
}

fn node_seed(addr: &SocketAddr) -> u64 {
    xxh3_64(addr.to_string().as_bytes())
}
