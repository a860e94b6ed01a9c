//! Cache node service trait

use super::errors::CacheResult;
use std::future::Future;
use std::time::Duration;

/// Operations against a single cache node
///
/// Implemented by the concrete node clients (memcached, in-memory). Values are
/// opaque bytes; the table encoding lives in [`super::codec`].
pub trait CacheService: Send + Sync {
    /// Returns `Ok(Some(bytes))` on hit, `Ok(None)` on miss
    fn get(&self, key: &str) -> impl Future<Output = CacheResult<Option<Vec<u8>>>> + Send;

    /// Store `value` under `key` for `ttl`
    fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    /// Check whether the node answers
    fn health_check(&self) -> impl Future<Output = CacheResult<bool>> + Send;

    fn provider_name(&self) -> &'static str;
}
