//! In-process cache tier
//!
//! Stands in for a memcached fleet when no cluster is available (local
//! development, tests). Every node address gets its own partition of one
//! shared `DashMap`, so routing behaves exactly as it would against real
//! nodes. Nodes can be failed and healed to exercise the degraded paths.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheService;
use dashmap::{DashMap, DashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// Per-node operation counters
#[derive(Debug, Default)]
struct NodeOps {
    gets: AtomicU64,
    sets: AtomicU64,
}

/// Snapshot of one node's operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeOpCounts {
    pub gets: u64,
    pub sets: u64,
}

/// Shared storage for all in-memory nodes
#[derive(Debug, Default)]
pub struct InMemoryCacheTier {
    entries: DashMap<(SocketAddr, String), StoredEntry>,
    failing: DashSet<SocketAddr>,
    ops: DashMap<SocketAddr, NodeOps>,
}

impl InMemoryCacheTier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Client view of one node's partition
    pub fn node(self: &Arc<Self>, addr: SocketAddr) -> InMemoryNode {
        InMemoryNode {
            tier: Arc::clone(self),
            addr,
        }
    }

    /// Make every operation against `addr` fail until healed
    pub fn fail_node(&self, addr: SocketAddr) {
        self.failing.insert(addr);
    }

    pub fn heal_node(&self, addr: SocketAddr) {
        self.failing.remove(&addr);
    }

    /// Unexpired keys stored on `addr`, sorted
    pub fn keys_on(&self, addr: SocketAddr) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == addr && e.value().expires_at > now)
            .map(|e| e.key().1.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn ops_on(&self, addr: SocketAddr) -> NodeOpCounts {
        self.ops
            .get(&addr)
            .map(|ops| NodeOpCounts {
                gets: ops.gets.load(Ordering::Relaxed),
                sets: ops.sets.load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }

    /// Overwrite a stored payload directly, bypassing the codec
    pub fn put_raw(&self, addr: SocketAddr, key: &str, bytes: Vec<u8>, ttl: Duration) {
        self.entries.insert(
            (addr, key.to_string()),
            StoredEntry {
                bytes,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn check_reachable(&self, addr: SocketAddr) -> CacheResult<()> {
        if self.failing.contains(&addr) {
            return Err(CacheError::ConnectionError(format!(
                "node {addr} is unreachable"
            )));
        }
        Ok(())
    }

    fn count(&self, addr: SocketAddr, f: impl FnOnce(&NodeOps)) {
        let ops = self.ops.entry(addr).or_default();
        f(ops.value());
    }
}

/// One node of an [`InMemoryCacheTier`]
#[derive(Debug, Clone)]
pub struct InMemoryNode {
    tier: Arc<InMemoryCacheTier>,
    addr: SocketAddr,
}

impl InMemoryNode {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl CacheService for InMemoryNode {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.tier.count(self.addr, |ops| {
            ops.gets.fetch_add(1, Ordering::Relaxed);
        });
        self.tier.check_reachable(self.addr)?;

        let slot = (self.addr, key.to_string());
        let now = Instant::now();
        let hit = self
            .tier
            .entries
            .get(&slot)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.bytes.clone());

        if hit.is_none() {
            self.tier.entries.remove_if(&slot, |_, entry| entry.expires_at <= now);
        }

        debug!(
            node = %self.addr,
            key = key,
            hit = hit.is_some(),
            "Cache GET (memory)"
        );
        Ok(hit)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.tier.count(self.addr, |ops| {
            ops.sets.fetch_add(1, Ordering::Relaxed);
        });
        self.tier.check_reachable(self.addr)?;
        self.tier.put_raw(self.addr, key, value.to_vec(), ttl);
        debug!(node = %self.addr, key = key, ttl_seconds = ttl.as_secs(), "Cache SET (memory)");
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(self.tier.check_reachable(self.addr).is_ok())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
