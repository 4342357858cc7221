//! Read-through cache-aside helper.
//!
//! This module implements the one caching rule every statistics endpoint
//! follows: read the cache unless the caller asked for a refresh, compute on
//! miss, write the fresh value back with a TTL, return it.
//!
//! Cache failures never fail a request. A read error or an unparseable
//! cached value is logged and handled as a miss; a write error is logged
//! and the computed value is still returned. Compute errors propagate
//! untouched.
//!
//! There is no stampede protection: concurrent misses on the same key each
//! run the compute function and the last write wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use opentribe_core::CacheError;
use serde::{de::DeserializeOwned, Serialize};

use super::traits::CacheBackend;

/// Where a value returned by [`StatsCache::get_or_compute`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
    /// Served from the cache; nothing was computed.
    Hit,
    /// Nothing usable was cached; computed and written back.
    Miss,
    /// The caller skipped the cache read; computed and written back.
    Bypass,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Bypass => "bypass",
        }
    }

    /// Returns true if the value was freshly computed.
    pub fn was_computed(&self) -> bool {
        !matches!(self, CacheOutcome::Hit)
    }
}

/// Result of a cache-aside read, carrying how it was served.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    outcome: CacheOutcome,
    /// Time spent in the compute function, if it ran.
    compute_secs: Option<f64>,
    /// Non-fatal cache failures encountered while serving.
    cache_errors: Vec<CacheError>,
}

impl<T> CacheRead<T> {
    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn outcome(&self) -> CacheOutcome {
        self.outcome
    }

    pub fn compute_secs(&self) -> Option<f64> {
        self.compute_secs
    }

    /// Cache failures that were logged and swallowed.
    pub fn cache_errors(&self) -> &[CacheError] {
        &self.cache_errors
    }
}

/// Cache-aside helper over a shared [`CacheBackend`].
///
/// Cheap to clone; all clones share the backend.
#[derive(Clone)]
pub struct StatsCache {
    backend: Arc<dyn CacheBackend>,
}

impl StatsCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    /// Return the snapshot cached under `key`, or compute, store and return
    /// a fresh one.
    ///
    /// 1. Unless `bypass` is set, read `key`. A parseable value is returned
    ///    immediately and `compute` is never called.
    /// 2. Otherwise await `compute`. Its error is returned as-is.
    /// 3. Write the JSON-encoded result with `ttl_secs`, even on bypass.
    /// 4. Return the fresh value.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        bypass: bool,
        compute: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut cache_errors = Vec::new();

        if !bypass {
            match self.read::<T>(key).await {
                Ok(Some(value)) => {
                    tracing::debug!(key, "Stats cache hit");
                    return Ok(CacheRead {
                        value,
                        outcome: CacheOutcome::Hit,
                        compute_secs: None,
                        cache_errors,
                    });
                }
                Ok(None) => tracing::debug!(key, "Stats cache miss"),
                Err(err) => {
                    tracing::warn!(key, error = %err, "Stats cache read failed, computing fresh value");
                    cache_errors.push(err);
                }
            }
        } else {
            tracing::debug!(key, "Stats cache bypassed by refresh request");
        }

        let started = Instant::now();
        let value = compute().await?;
        let compute_secs = started.elapsed().as_secs_f64();

        if let Err(err) = self.write(key, &value, ttl_secs).await {
            tracing::warn!(key, ttl_secs, error = %err, "Stats cache write failed, returning computed value");
            cache_errors.push(err);
        }

        Ok(CacheRead {
            value,
            outcome: if bypass {
                CacheOutcome::Bypass
            } else {
                CacheOutcome::Miss
            },
            compute_secs: Some(compute_secs),
            cache_errors,
        })
    }

    /// Read and decode `key`. Corrupt JSON is reported as an error so the
    /// caller treats it like a miss.
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<(), CacheError> {
        let json = serde_json::to_string(value).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.backend.set(key, &json, ttl_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCacheBackend;
    use crate::cache::traits::CacheStats;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counts {
        total: u64,
        value: f64,
    }

    /// Backend that records calls and can be told to fail.
    #[derive(Default)]
    struct ScriptedBackend {
        stored: Mutex<Option<String>>,
        gets: AtomicUsize,
        sets: Mutex<Vec<(String, String, u64)>>,
        fail_get: bool,
        fail_set: bool,
    }

    #[async_trait]
    impl CacheBackend for ScriptedBackend {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_get {
                return Err(CacheError::Read {
                    key: key.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
            self.sets
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string(), ttl_secs));
            if self.fail_set {
                return Err(CacheError::Write {
                    key: key.to_string(),
                    reason: "read only replica".to_string(),
                });
            }
            *self.stored.lock().unwrap() = Some(value.to_string());
            Ok(())
        }

        async fn ping(&self) -> Result<(), CacheError> {
            Ok(())
        }

        async fn stats(&self) -> Result<CacheStats, CacheError> {
            Ok(CacheStats::default())
        }
    }

    fn counts() -> Counts {
        Counts {
            total: 42,
            value: 150_000.0,
        }
    }

    #[tokio::test]
    async fn test_hit_skips_compute() {
        let backend = Arc::new(ScriptedBackend::default());
        *backend.stored.lock().unwrap() = Some(r#"{"total":42,"value":150000}"#.to_string());
        let cache = StatsCache::new(backend.clone());
        let computed = AtomicUsize::new(0);

        let read = cache
            .get_or_compute("k", 600, false, || async {
                computed.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Counts { total: 0, value: 0.0 })
            })
            .await
            .unwrap();

        assert_eq!(read.outcome(), CacheOutcome::Hit);
        assert_eq!(read.value(), &counts());
        assert_eq!(computed.load(Ordering::SeqCst), 0);
        assert!(backend.sets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_miss_computes_once_and_writes_json() {
        let backend = Arc::new(ScriptedBackend::default());
        let cache = StatsCache::new(backend.clone());
        let computed = AtomicUsize::new(0);

        let read = cache
            .get_or_compute("bounties:stats", 600, false, || async {
                computed.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(counts())
            })
            .await
            .unwrap();

        assert_eq!(read.outcome(), CacheOutcome::Miss);
        assert!(read.compute_secs().is_some());
        assert_eq!(computed.load(Ordering::SeqCst), 1);

        let sets = backend.sets.lock().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].0, "bounties:stats");
        assert_eq!(sets[0].2, 600);
        let written: Counts = serde_json::from_str(&sets[0].1).unwrap();
        assert_eq!(written, counts());
    }

    #[tokio::test]
    async fn test_bypass_never_reads_but_writes() {
        let backend = Arc::new(ScriptedBackend::default());
        *backend.stored.lock().unwrap() = Some(r#"{"total":1,"value":1}"#.to_string());
        let cache = StatsCache::new(backend.clone());

        let read = cache
            .get_or_compute("grants:stats", 600, true, || async { Ok::<_, String>(counts()) })
            .await
            .unwrap();

        assert_eq!(read.outcome(), CacheOutcome::Bypass);
        assert_eq!(read.into_value(), counts());
        assert_eq!(backend.gets.load(Ordering::SeqCst), 0);
        assert_eq!(backend.sets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_compute_error_propagates_without_write() {
        let backend = Arc::new(ScriptedBackend::default());
        let cache = StatsCache::new(backend.clone());

        let result = cache
            .get_or_compute("rfps:stats", 1800, false, || async {
                Err::<Counts, _>("Database connection failed".to_string())
            })
            .await;

        assert_eq!(result.unwrap_err(), "Database connection failed");
        assert!(backend.sets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_falls_through_to_compute() {
        let backend = Arc::new(ScriptedBackend {
            fail_get: true,
            ..Default::default()
        });
        let cache = StatsCache::new(backend.clone());

        let read = cache
            .get_or_compute("k", 60, false, || async { Ok::<_, String>(counts()) })
            .await
            .unwrap();

        assert_eq!(read.outcome(), CacheOutcome::Miss);
        assert_eq!(read.cache_errors().len(), 1);
        assert!(matches!(read.cache_errors()[0], CacheError::Read { .. }));
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_value() {
        let backend = Arc::new(ScriptedBackend {
            fail_set: true,
            ..Default::default()
        });
        let cache = StatsCache::new(backend.clone());

        let read = cache
            .get_or_compute("k", 60, false, || async { Ok::<_, String>(counts()) })
            .await
            .unwrap();

        assert_eq!(read.value(), &counts());
        assert!(matches!(read.cache_errors()[0], CacheError::Write { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_recomputed_and_overwritten() {
        let backend = Arc::new(ScriptedBackend::default());
        *backend.stored.lock().unwrap() = Some("not json".to_string());
        let cache = StatsCache::new(backend.clone());

        let read = cache
            .get_or_compute("k", 60, false, || async { Ok::<_, String>(counts()) })
            .await
            .unwrap();

        assert_eq!(read.outcome(), CacheOutcome::Miss);
        assert!(matches!(read.cache_errors()[0], CacheError::Corrupt { .. }));
        let stored = backend.stored.lock().unwrap().clone().unwrap();
        assert_eq!(serde_json::from_str::<Counts>(&stored).unwrap(), counts());
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_memory_backend() {
        let cache = StatsCache::new(Arc::new(InMemoryCacheBackend::new()));
        let computed = AtomicUsize::new(0);

        for _ in 0..3 {
            let read = cache
                .get_or_compute("homepage:stats", 300, false, || async {
                    computed.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(counts())
                })
                .await
                .unwrap();
            assert_eq!(read.value(), &counts());
        }

        assert_eq!(computed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CacheOutcome::Hit.as_str(), "hit");
        assert!(!CacheOutcome::Hit.was_computed());
        assert!(CacheOutcome::Miss.was_computed());
        assert!(CacheOutcome::Bypass.was_computed());
    }
}
