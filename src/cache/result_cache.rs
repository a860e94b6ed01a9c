//! Get-or-compute over the cache tier.
//!
//! A hit returns the decoded table. A miss, an unreadable payload, or an
//! unreachable tier all fall through to the caller's compute function, whose
//! result is written back before it is returned. Only the compute function's
//! own error ever reaches the caller.
//!
//! Concurrent calls for the same key are not de-duplicated: if two fetches
//! race before either has written back, both compute.

use super::client::CacheClient;
use super::codec::{decode_table, encode_table};
use crate::table::Table;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    decode_failures: AtomicU64,
    write_failures: AtomicU64,
    computes: AtomicU64,
}

/// Counters since the cache was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Includes reads that failed to decode
    pub misses: u64,
    pub decode_failures: u64,
    /// Write-backs no node acknowledged (includes degraded mode)
    pub write_failures: u64,
    pub computes: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultCache {
    client: Arc<CacheClient>,
    default_ttl: Duration,
    stats: Arc<StatsCounters>,
}

impl ResultCache {
    pub fn new(client: Arc<CacheClient>, default_ttl: Duration) -> Self {
        Self {
            client,
            default_ttl,
            stats: Arc::new(StatsCounters::default()),
        }
    }

    pub fn client(&self) -> &Arc<CacheClient> {
        &self.client
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the cached table for `key`, or compute, store and return it
    ///
    /// `compute` runs at most once and only on a miss. Its error is returned
    /// unchanged and nothing is written in that case.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Table, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Table, E>>,
    {
        if let Some(bytes) = self.client.get(key).await {
            match decode_table(&bytes) {
                Ok(table) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = key, rows = table.row_count(), "Result cache hit");
                    return Ok(table);
                }
                Err(e) => {
                    self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(key = key, error = %e, "Cached payload unreadable, recomputing");
                }
            }
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        self.stats.computes.fetch_add(1, Ordering::Relaxed);
        let table = compute().await?;

        let stored = match encode_table(&table) {
            Ok(bytes) => self.client.set(key, &bytes, ttl).await,
            Err(e) => {
                warn!(key = key, error = %e, "Could not encode result for caching");
                false
            }
        };
        if !stored {
            self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
        }
        debug!(key = key, rows = table.row_count(), stored = stored, "Result cache miss filled");

        Ok(table)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            decode_failures: self.stats.decode_failures.load(Ordering::Relaxed),
            write_failures: self.stats.write_failures.load(Ordering::Relaxed),
            computes: self.stats.computes.load(Ordering::Relaxed),
        }
    }
}
