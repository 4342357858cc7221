//! Cache layer for statistics snapshots.
//!
//! Snapshots are stored as JSON text under namespaced keys
//! (`"bounties:stats"`, `"homepage:stats"`, ...). Expiry is the backend's
//! job: entries are written with a TTL and never explicitly deleted.
//!
//! # Example
//!
//! ```ignore
//! let cache = StatsCache::new(Arc::new(InMemoryCacheBackend::new()));
//!
//! let read = cache
//!     .get_or_compute("bounties:stats", 600, refresh, || compute_bounty_stats(&store))
//!     .await?;
//!
//! if read.outcome() == CacheOutcome::Hit {
//!     tracing::debug!("served from cache");
//! }
//! ```

pub mod memory;
pub mod read_through;
pub mod redis_backend;
pub mod traits;

pub use memory::InMemoryCacheBackend;
pub use read_through::{CacheOutcome, CacheRead, StatsCache};
pub use redis_backend::RedisCacheBackend;
pub use traits::{CacheBackend, CacheStats};
