//! Cache backend trait.

use async_trait::async_trait;
use opentribe_core::CacheError;

/// Cache backend trait for pluggable key/value stores.
///
/// This trait abstracts over Redis and the in-memory backend. Values are
/// opaque strings; the read-through layer owns (de)serialization, so every
/// backend stores exactly what it was given.
///
/// Single-key operations are assumed atomic. Implementations must be safe
/// to share across request tasks.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl_secs` seconds.
    ///
    /// Overwrites any existing value and resets its TTL.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Round-trip to the backend for readiness checks.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found a live entry.
    pub hits: u64,
    /// Number of reads that found nothing (or an expired entry).
    pub misses: u64,
    /// Number of writes.
    pub writes: u64,
    /// Number of entries currently held, where the backend can tell.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
