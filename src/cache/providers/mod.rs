//! Cache node clients
//!
//! [`NodeClient`] is the enum the router holds per node; [`NodeConnector`]
//! decides which variant gets built for each address in a node set.

pub mod memcached;
pub mod memory;

pub use memcached::MemcachedNode;
pub use memory::{InMemoryCacheTier, InMemoryNode, NodeOpCounts};

use super::errors::CacheResult;
use super::traits::CacheService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Client for one cache node (enum dispatch, no vtable)
#[derive(Debug, Clone)]
pub enum NodeClient {
    Memcached(Box<MemcachedNode>),
    InMemory(InMemoryNode),
}

impl CacheService for NodeClient {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        match self {
            Self::Memcached(node) => node.get(key).await,
            Self::InMemory(node) => node.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Memcached(node) => node.set(key, value, ttl).await,
            Self::InMemory(node) => node.set(key, value, ttl).await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self {
            Self::Memcached(node) => node.health_check().await,
            Self::InMemory(node) => node.health_check().await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::Memcached(node) => node.provider_name(),
            Self::InMemory(node) => node.provider_name(),
        }
    }
}

/// Builds a [`NodeClient`] for each address when a router is (re)built
#[derive(Debug, Clone)]
pub enum NodeConnector {
    Memcached { operation_timeout: Duration },
    InMemory(Arc<InMemoryCacheTier>),
}

impl NodeConnector {
    pub fn connect(&self, addr: SocketAddr) -> NodeClient {
        match self {
            Self::Memcached { operation_timeout } => {
                NodeClient::Memcached(Box::new(MemcachedNode::new(addr, *operation_timeout)))
            }
            Self::InMemory(tier) => NodeClient::InMemory(tier.node(addr)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memcached { .. } => "memcached",
            Self::InMemory(_) => "memory",
        }
    }
}
