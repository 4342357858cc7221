//! Redis-backed cache using a deadpool connection pool.
//!
//! Writes use `SET key value EX ttl`, so expiry is enforced by Redis itself.
//! Hit/miss counters are process-local; `entry_count` reports `DBSIZE`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use opentribe_core::CacheError;
use redis::AsyncCommands;

use super::traits::{CacheBackend, CacheStats};

/// Redis cache backend.
pub struct RedisCacheBackend {
    pool: Pool,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl RedisCacheBackend {
    /// Wrap an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Build a pool for `url` (`redis://host:port/db`) with at most
    /// `max_size` connections.
    pub fn from_url(url: &str, max_size: usize) -> Result<Self, CacheError> {
        let mut cfg = Config::from_url(url);
        cfg.pool = Some(PoolConfig::new(max_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(format!("Failed to create pool: {}", e)))?;
        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "Redis pool checkout failed");
            CacheError::Connection(e.to_string())
        })
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(|e| CacheError::Read {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| CacheError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut conn = self.conn().await?;
        let entry_count: u64 = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            entry_count,
        })
    }
}
