//! Cache client: topology plus the router built from it
//!
//! Every operation pulls the current node set from [`CacheTopology`] and, if
//! the snapshot changed since the last call, swaps in a rebuilt
//! [`CacheRouter`] before routing. A disabled client never touches the
//! network and behaves like an empty node set.

use super::providers::{InMemoryCacheTier, NodeConnector};
use super::router::{CacheRouter, NodeHealth};
use super::topology::{CacheTopology, NameResolver};
use crate::config::{CacheBackendKind, CacheConfig};
use crate::resilience::CircuitBreakerConfig;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug)]
struct Discovered {
    topology: Arc<CacheTopology>,
    connector: NodeConnector,
    breaker_config: Option<CircuitBreakerConfig>,
    router: RwLock<Arc<CacheRouter>>,
}

/// Entry point for cache reads and writes
#[derive(Debug)]
pub struct CacheClient {
    discovered: Option<Discovered>,
    disabled_router: Arc<CacheRouter>,
}

impl CacheClient {
    pub fn new(
        topology: Arc<CacheTopology>,
        connector: NodeConnector,
        breaker_config: Option<CircuitBreakerConfig>,
    ) -> Self {
        info!(
            service = %topology.service_name(),
            backend = connector.backend_name(),
            resync_interval_seconds = topology.resync_interval().as_secs(),
            "Cache client initialized"
        );
        Self {
            discovered: Some(Discovered {
                topology,
                connector,
                breaker_config,
                router: RwLock::new(Arc::new(CacheRouter::empty())),
            }),
            disabled_router: Arc::new(CacheRouter::empty()),
        }
    }

    /// Client that always misses and drops every write
    pub fn disabled() -> Self {
        info!("Caching disabled, all panels will query the engine directly");
        Self {
            discovered: None,
            disabled_router: Arc::new(CacheRouter::empty()),
        }
    }

    /// Build from configuration
    ///
    /// `memory_tier` is used by the `memory` backend; when absent a fresh
    /// tier is created.
    pub fn from_config(
        config: &CacheConfig,
        resolver: Arc<dyn NameResolver>,
        memory_tier: Option<Arc<InMemoryCacheTier>>,
    ) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let topology = Arc::new(CacheTopology::new(
            config.service_host.clone(),
            config.service_port,
            config.resync_interval(),
            resolver,
        ));
        let connector = match config.backend {
            CacheBackendKind::Memcached => NodeConnector::Memcached {
                operation_timeout: config.operation_timeout(),
            },
            CacheBackendKind::Memory => {
                NodeConnector::InMemory(memory_tier.unwrap_or_else(InMemoryCacheTier::new))
            }
        };
        let breaker_config = config
            .circuit_breaker
            .enabled
            .then(|| config.circuit_breaker.to_breaker_config());

        Self::new(topology, connector, breaker_config)
    }

    pub fn is_enabled(&self) -> bool {
        self.discovered.is_some()
    }

    pub fn topology(&self) -> Option<&Arc<CacheTopology>> {
        self.discovered.as_ref().map(|d| &d.topology)
    }

    /// Router for the current node set
    ///
    /// Rebuilt (reusing surviving node clients) whenever the topology hands
    /// back a different node-set snapshot.
    pub async fn router(&self) -> Arc<CacheRouter> {
        let Some(discovered) = &self.discovered else {
            return Arc::clone(&self.disabled_router);
        };

        let snapshot = discovered.topology.snapshot().await;
        let current = discovered.router.read().clone();
        if Arc::ptr_eq(current.nodes(), &snapshot.nodes) {
            return current;
        }

        let mut slot = discovered.router.write();
        // Another caller may have swapped in this snapshot, or a newer one
        if Arc::ptr_eq(slot.nodes(), &snapshot.nodes) || slot.generation() > snapshot.generation {
            return slot.clone();
        }

        debug!(
            previous_generation = slot.generation(),
            generation = snapshot.generation,
            nodes = snapshot.nodes.len(),
            "Rebuilding cache router for new node set"
        );
        let rebuilt = Arc::new(CacheRouter::build(
            snapshot.nodes,
            snapshot.generation,
            &discovered.connector,
            discovered.breaker_config.as_ref(),
            Some(&**slot),
        ));
        *slot = Arc::clone(&rebuilt);
        rebuilt
    }

    /// Best-effort read; `None` on miss, degraded mode, or node failure
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.router().await.get(key).await
    }

    /// Best-effort write; returns whether a node acknowledged it
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> bool {
        self.router().await.set(key, value, ttl).await
    }

    /// Health of every node in the current node set
    pub async fn node_health(&self) -> Vec<NodeHealth> {
        self.router().await.health().await
    }
}
