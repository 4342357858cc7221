//! In-process cache backend with per-entry TTL.
//!
//! Used when no Redis URL is configured and as the default backend in
//! tests. Expiry is lazy: an expired entry is dropped by the read that
//! finds it, or by [`InMemoryCacheBackend::purge_expired`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use opentribe_core::CacheError;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::traits::{CacheBackend, CacheStats};

/// Longest lifetime an entry can get. Larger TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Expiry instant for a TTL starting at `now`, clamped to [`MAX_TTL`].
fn expiry(now: Instant, ttl_secs: u64) -> Instant {
    let ttl = Duration::from_secs(ttl_secs).min(MAX_TTL);
    now.checked_add(ttl).unwrap_or(now)
}

/// Value of `key` if it is still live at `now`; an expired entry is removed.
fn take_live_or_evict(
    entries: &mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<String> {
    match entries.get(key) {
        Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
        Some(_) => {
            entries.remove(key);
            None
        }
        None => None,
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// TTL-enforcing in-memory cache.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of `key`, if it holds a live entry.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        entry.expires_at.checked_duration_since(Instant::now())
            .filter(|remaining| !remaining.is_zero())
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: re-check under the write lock, a concurrent set may have
        // refreshed it.
        let mut entries = self.entries.write().await;
        let value = take_live_or_evict(&mut entries, key, now);
        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: expiry(Instant::now(), ttl_secs),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            entry_count: self.entries.read().await.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = InMemoryCacheBackend::new();
        assert_eq!(cache.get("bounties:stats").await.unwrap(), None);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryCacheBackend::new();
        cache.set("grants:stats", "{\"a\":1}", 600).await.unwrap();

        assert_eq!(
            cache.get("grants:stats").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = InMemoryCacheBackend::new();
        cache.set("rfps:stats", "{}", 10).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get("rfps:stats").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("rfps:stats").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_ttl() {
        let cache = InMemoryCacheBackend::new();
        cache.set("homepage:stats", "old", 10).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("homepage:stats", "new", 10).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(
            cache.get("homepage:stats").await.unwrap().as_deref(),
            Some("new")
        );
        let remaining = cache.ttl("homepage:stats").await.unwrap();
        assert_eq!(remaining, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let cache = InMemoryCacheBackend::new();
        cache.set("bounties:stats", "{}", u64::MAX).await.unwrap();

        assert_eq!(
            cache.get("bounties:stats").await.unwrap().as_deref(),
            Some("{}")
        );
        let remaining = cache.ttl("bounties:stats").await.unwrap();
        assert!(remaining <= MAX_TTL);
        assert!(remaining > MAX_TTL - Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_recheck_serves_entry_refreshed_after_first_read() {
        let now = Instant::now();
        let mut entries = HashMap::new();
        entries.insert(
            "grants:stats".to_string(),
            Entry {
                value: "new".to_string(),
                expires_at: expiry(now, 60),
            },
        );
        entries.insert(
            "rfps:stats".to_string(),
            Entry {
                value: "old".to_string(),
                expires_at: now,
            },
        );

        assert_eq!(
            take_live_or_evict(&mut entries, "grants:stats", now).as_deref(),
            Some("new")
        );
        assert!(entries.contains_key("grants:stats"));

        assert_eq!(take_live_or_evict(&mut entries, "rfps:stats", now), None);
        assert!(!entries.contains_key("rfps:stats"));
        assert_eq!(take_live_or_evict(&mut entries, "missing", now), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = InMemoryCacheBackend::new();
        cache.set("short", "1", 1).await.unwrap();
        cache.set("long", "2", 100).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.ttl("short").await.is_none());
    }
}
