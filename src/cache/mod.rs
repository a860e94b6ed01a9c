//! # Result Cache Layer
//!
//! Sits between the panels and the remote query engine. Discovers memcached
//! nodes behind one service name, routes keys across them, and wraps each
//! panel query in get-or-compute.
//!
//! ## Architecture
//!
//! ```text
//! ResultCache::get_or_compute(key, ttl, compute)
//!   └── CacheClient
//!         ├── CacheTopology  <- name -> NodeSet, resynced lazily
//!         └── CacheRouter    <- rendezvous hashing over the NodeSet
//!               └── NodeClient (enum)
//!                     ├── Memcached(MemcachedNode)
//!                     └── InMemory(InMemoryNode)
//! ```
//!
//! ## Design Decisions
//!
//! - **Best effort everywhere**: resolution failures, node errors and bad
//!   payloads all degrade to a cache miss; none reach the caller
//! - **Empty node set is a mode, not an error**: the router becomes a no-op
//!   and every lookup computes
//! - **Enum dispatch** for node clients, trait objects only at the resolver seam

pub mod client;
pub mod codec;
pub mod errors;
pub mod providers;
pub mod result_cache;
pub mod router;
pub mod topology;
pub mod traits;

pub use client::CacheClient;
pub use errors::{CacheError, CacheResult};
pub use providers::{InMemoryCacheTier, MemcachedNode, NodeClient, NodeConnector};
pub use result_cache::{CacheStats, ResultCache};
pub use router::{CacheRouter, NodeHealth};
pub use topology::{
    CacheTopology, DnsResolver, NameResolver, NodeSet, TopologyError, TopologySnapshot,
};
pub use traits::CacheService;
