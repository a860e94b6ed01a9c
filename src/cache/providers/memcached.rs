//! Memcached node client
//!
//! One lazily opened connection per node, guarded by a `tokio::sync::Mutex`.
//! A failed or timed-out round trip drops the connection so the next call
//! reconnects; the router's circuit breaker keeps a dead node from being
//! redialed on every request.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheService;
use crate::config::MAX_RELATIVE_TTL_SECONDS;
use async_memcached::{AsciiProtocol, Client};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

/// Longest key the memcached text protocol accepts
pub const MAX_KEY_LENGTH: usize = 250;

/// Client for a single memcached node
#[derive(Clone)]
pub struct MemcachedNode {
    addr: SocketAddr,
    url: String,
    operation_timeout: Duration,
    client: Arc<Mutex<Option<Client>>>,
}

impl std::fmt::Debug for MemcachedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedNode")
            .field("addr", &self.addr)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl MemcachedNode {
    /// Create a client for `addr`; no connection is opened until first use
    pub fn new(addr: SocketAddr, operation_timeout: Duration) -> Self {
        Self {
            addr,
            url: format!("tcp://{addr}"),
            operation_timeout,
            client: Arc::new(Mutex::new(None)),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn connected<'a>(&self, slot: &'a mut Option<Client>) -> CacheResult<&'a mut Client> {
        if slot.is_none() {
            let client = timeout(self.operation_timeout, Client::new(&self.url))
                .await
                .map_err(|_| CacheError::Timeout(format!("connect to {}", self.addr)))?
                .map_err(|e| {
                    CacheError::ConnectionError(format!("Failed to connect to {}: {e}", self.addr))
                })?;
            debug!(node = %self.addr, "Memcached connection opened");
            *slot = Some(client);
        }
        slot.as_mut()
            .ok_or_else(|| CacheError::ConnectionError(format!("no connection to {}", self.addr)))
    }
}

impl CacheService for MemcachedNode {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let mut guard = self.client.lock().await;
        let client = self.connected(&mut guard).await?;

        let result = timeout(self.operation_timeout, client.get(key)).await;
        match result {
            Ok(Ok(Some(value))) => {
                debug!(node = %self.addr, key = key, "Cache HIT (memcached)");
                Ok(value.data)
            }
            Ok(Ok(None)) => {
                debug!(node = %self.addr, key = key, "Cache MISS (memcached)");
                Ok(None)
            }
            Ok(Err(e)) => {
                *guard = None;
                Err(CacheError::BackendError(format!("Memcached GET failed: {e}")))
            }
            Err(_) => {
                *guard = None;
                Err(CacheError::Timeout(format!("GET {key} on {}", self.addr)))
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        validate_key(key)?;
        let ttl_seconds = expiry_seconds(ttl);
        let mut guard = self.client.lock().await;
        let client = self.connected(&mut guard).await?;

        let result = timeout(
            self.operation_timeout,
            client.set(key, value, Some(ttl_seconds), None),
        )
        .await;
        match result {
            Ok(Ok(())) => {
                debug!(
                    node = %self.addr,
                    key = key,
                    ttl_seconds = ttl_seconds,
                    bytes = value.len(),
                    "Cache SET (memcached)"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                *guard = None;
                Err(CacheError::BackendError(format!("Memcached SET failed: {e}")))
            }
            Err(_) => {
                *guard = None;
                Err(CacheError::Timeout(format!("SET {key} on {}", self.addr)))
            }
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        let mut guard = self.client.lock().await;
        let client = match self.connected(&mut guard).await {
            Ok(client) => client,
            Err(e) => {
                debug!(node = %self.addr, error = %e, "Memcached health check failed");
                return Ok(false);
            }
        };

        let result = timeout(self.operation_timeout, client.version()).await;
        match result {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => {
                debug!(node = %self.addr, error = %e, "Memcached health check failed");
                *guard = None;
                Ok(false)
            }
            Err(_) => {
                *guard = None;
                Ok(false)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "memcached"
    }
}

/// Memcached expiry for `ttl`
///
/// Rounds up to whole seconds and clamps to `1..=30 days`: 0 would mean
/// "never expire" and anything past 30 days is read as a unix timestamp.
pub fn expiry_seconds(ttl: Duration) -> i64 {
    let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    let clamped = seconds.clamp(1, MAX_RELATIVE_TTL_SECONDS);
    if clamped != seconds {
        debug!(requested_ms = ttl.as_millis() as u64, ttl_seconds = clamped, "TTL clamped to memcached range");
    }
    clamped as i64
}

/// Reject keys the memcached text protocol cannot carry
pub fn validate_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("empty key".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key is {} bytes, limit is {MAX_KEY_LENGTH}",
            key.len()
        )));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CacheError::InvalidKey(format!(
            "key {key:?} contains whitespace or control characters"
        )));
    }
    Ok(())
}
