//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use opentribe_core::OpentribeResult;
use opentribe_storage::{
    CacheBackend, InMemoryCacheBackend, InMemoryStatsStore, RedisCacheBackend, StatsCache,
    StatsStore,
};

use crate::config::{CacheSettings, ExchangeRateConfig, StatsConfig, StoreKind};
use crate::db::{DbClient, DbConfig};
use crate::error::ApiResult;
use crate::exchange::{ExchangeRateService, PriceSource};

/// Application-wide state shared across all routes.
///
/// Every collaborator is built once at startup and injected here; handlers
/// pull the pieces they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence queries behind the statistics snapshots.
    pub store: Arc<dyn StatsStore>,
    /// Cache-aside helper shared by every cached endpoint.
    pub cache: StatsCache,
    pub stats_config: Arc<StatsConfig>,
    pub exchange: Arc<ExchangeRateService>,
    pub exchange_config: Arc<ExchangeRateConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn StatsStore>,
        cache_backend: Arc<dyn CacheBackend>,
        stats_config: StatsConfig,
        exchange_config: ExchangeRateConfig,
        price_source: Arc<dyn PriceSource>,
    ) -> Self {
        let cache = StatsCache::new(cache_backend);
        let exchange = ExchangeRateService::new(cache.clone(), price_source, exchange_config.ttl_secs);
        Self {
            store,
            cache,
            stats_config: Arc::new(stats_config),
            exchange: Arc::new(exchange),
            exchange_config: Arc::new(exchange_config),
            start_time: Instant::now(),
        }
    }
}

// Use macro to reduce boilerplate for FromRef implementations
crate::impl_from_ref! {
    Arc<dyn StatsStore> => store,
    StatsCache => cache,
    Arc<StatsConfig> => stats_config,
    Arc<ExchangeRateService> => exchange,
    Arc<ExchangeRateConfig> => exchange_config,
    Instant => start_time,
}

/// Build the cache backend: Redis when a URL is configured, otherwise a
/// process-local map.
pub fn build_cache_backend(settings: &CacheSettings) -> OpentribeResult<Arc<dyn CacheBackend>> {
    match &settings.redis_url {
        Some(url) => {
            let backend = RedisCacheBackend::from_url(url, settings.redis_pool_size)?;
            tracing::info!(pool_size = settings.redis_pool_size, "Using Redis cache backend");
            Ok(Arc::new(backend))
        }
        None => {
            tracing::warn!("OPENTRIBE_REDIS_URL not set, using in-memory cache backend");
            Ok(Arc::new(InMemoryCacheBackend::new()))
        }
    }
}

/// Build the statistics store selected by `kind`.
pub fn build_store(kind: StoreKind, db_config: &DbConfig) -> ApiResult<Arc<dyn StatsStore>> {
    match kind {
        StoreKind::Postgres => {
            let db = DbClient::from_config(db_config)?;
            tracing::info!(
                host = %db_config.host,
                dbname = %db_config.dbname,
                pool_size = db.pool_size(),
                "Using PostgreSQL statistics store"
            );
            Ok(Arc::new(db))
        }
        StoreKind::Memory => {
            tracing::warn!("Using empty in-memory statistics store");
            Ok(Arc::new(InMemoryStatsStore::new()))
        }
    }
}
