//! # Cache Topology Discovery
//!
//! Tracks the set of memcached nodes behind one logical service name (a
//! headless Kubernetes service, typically). The name is re-resolved lazily:
//! a caller asking for the node set after the resync interval has passed
//! triggers one resolution, every other caller gets the cached snapshot with
//! no network activity.
//!
//! ## Architecture
//!
//! ```text
//! current_nodes()
//!   ├── fresh snapshot ─────────────────────────> Arc<NodeSet> (no I/O)
//!   └── stale snapshot
//!         ├── resync lock free  -> resolve name -> replace snapshot if changed
//!         └── resync in flight  ──────────────────> last-good Arc<NodeSet>
//! ```
//!
//! ## Design Decisions
//!
//! - **Resolution failure is not an error**: it yields the empty node set, which
//!   downstream means "no cache available"
//! - **Snapshot identity**: an unchanged resolution keeps the existing
//!   `Arc<NodeSet>`, so routers built from it stay valid
//! - **Single resync**: a `tokio::sync::Mutex` serializes resolution; readers
//!   never wait on it once a first snapshot exists

use crate::logging::log_topology_change;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Failed to resolve {host}:{port}: {reason}")]
    ResolutionFailed {
        host: String,
        port: u16,
        reason: String,
    },
}

/// Resolves a logical host name to node endpoints
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, TopologyError>;
}

/// System resolver backed by `tokio::net::lookup_host`
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

#[async_trait]
impl NameResolver for DnsResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, TopologyError> {
        tokio::net::lookup_host((host, port))
            .await
            .map(|addrs| addrs.collect())
            .map_err(|e| TopologyError::ResolutionFailed {
                host: host.to_string(),
                port,
                reason: e.to_string(),
            })
    }
}

/// Node endpoints currently believed reachable, compared by value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodeSet(BTreeSet<SocketAddr>);

impl NodeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.0.contains(addr)
    }

    /// Endpoints in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = &SocketAddr> {
        self.0.iter()
    }
}

impl FromIterator<SocketAddr> for NodeSet {
    fn from_iter<I: IntoIterator<Item = SocketAddr>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addrs: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", addrs.join(", "))
    }
}

/// Node set plus resync bookkeeping
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    pub nodes: Arc<NodeSet>,
    /// Incremented each time the node set changes by value
    pub generation: u64,
    /// `None` until the first resolution attempt finishes
    pub last_resync: Option<Instant>,
}

/// Owner of the node-set snapshot for one logical cache service
pub struct CacheTopology {
    service_host: String,
    service_port: u16,
    resync_interval: Duration,
    resolver: Arc<dyn NameResolver>,
    snapshot: RwLock<TopologySnapshot>,
    resync_lock: Mutex<()>,
}

impl fmt::Debug for CacheTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTopology")
            .field("service_host", &self.service_host)
            .field("service_port", &self.service_port)
            .field("resync_interval", &self.resync_interval)
            .field("snapshot", &*self.snapshot.read())
            .finish()
    }
}

impl CacheTopology {
    pub fn new(
        service_host: impl Into<String>,
        service_port: u16,
        resync_interval: Duration,
        resolver: Arc<dyn NameResolver>,
    ) -> Self {
        Self {
            service_host: service_host.into(),
            service_port,
            resync_interval,
            resolver,
            snapshot: RwLock::new(TopologySnapshot {
                nodes: Arc::new(NodeSet::empty()),
                generation: 0,
                last_resync: None,
            }),
            resync_lock: Mutex::new(()),
        }
    }

    pub fn service_name(&self) -> String {
        format!("{}:{}", self.service_host, self.service_port)
    }

    pub fn resync_interval(&self) -> Duration {
        self.resync_interval
    }

    /// Current node set, resyncing first if the snapshot is stale
    pub async fn current_nodes(&self) -> Arc<NodeSet> {
        self.snapshot().await.nodes
    }

    /// Current snapshot, resyncing first if it is stale
    ///
    /// The very first resolution blocks concurrent callers (there is nothing
    /// to serve yet). Later resyncs run in whichever caller finds the snapshot
    /// stale first; everyone else keeps reading the last-good snapshot.
    pub async fn snapshot(&self) -> TopologySnapshot {
        let current = self.snapshot.read().clone();
        if !self.is_stale(&current) {
            return current;
        }

        if current.last_resync.is_none() {
            let _guard = self.resync_lock.lock().await;
            return self.resync_if_stale().await;
        }

        match self.resync_lock.try_lock() {
            Ok(_guard) => self.resync_if_stale().await,
            Err(_) => {
                debug!(service = %self.service_name(), "Resync in flight, serving last snapshot");
                current
            }
        }
    }

    fn is_stale(&self, snapshot: &TopologySnapshot) -> bool {
        match snapshot.last_resync {
            None => true,
            Some(at) => Instant::now().duration_since(at) > self.resync_interval,
        }
    }

    /// Caller must hold `resync_lock`
    async fn resync_if_stale(&self) -> TopologySnapshot {
        let current = self.snapshot.read().clone();
        if !self.is_stale(&current) {
            return current;
        }

        let resolved: NodeSet = match self
            .resolver
            .resolve(&self.service_host, self.service_port)
            .await
        {
            Ok(addrs) => addrs.into_iter().collect(),
            Err(e) => {
                warn!(
                    service = %self.service_name(),
                    error = %e,
                    "Cache service resolution failed, treating as zero nodes"
                );
                NodeSet::empty()
            }
        };

        let mut snapshot = self.snapshot.write();
        if *snapshot.nodes != resolved {
            let previous = snapshot.nodes.len();
            snapshot.nodes = Arc::new(resolved);
            snapshot.generation += 1;
            log_topology_change(
                &self.service_name(),
                previous,
                snapshot.nodes.len(),
                snapshot.generation,
            );
        }
        snapshot.last_resync = Some(Instant::now());
        snapshot.clone()
    }
}
