//! Opentribe Storage - Cache and Persistence Abstractions
//!
//! Defines the two collaborators of the statistics layer and the
//! cache-aside helper that ties them together:
//!
//! - [`CacheBackend`]: string key/value store with per-entry TTL
//!   (Redis in production, [`InMemoryCacheBackend`] for development and tests)
//! - [`StatsStore`]: read-only aggregate queries over marketplace records
//!   (PostgreSQL lives in opentribe-api, [`InMemoryStatsStore`] here)
//! - [`StatsCache`]: read-through `get_or_compute` with refresh bypass

pub mod cache;
pub mod memory;
pub mod store;

pub use cache::{
    CacheBackend, CacheOutcome, CacheRead, CacheStats, InMemoryCacheBackend, RedisCacheBackend,
    StatsCache,
};
pub use memory::InMemoryStatsStore;
pub use store::{
    ApplicationActivity, OrganizationOpportunities, StatsStore, SubmissionActivity,
};
