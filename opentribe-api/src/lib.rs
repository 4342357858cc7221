//! Opentribe API - Cached Statistics Layer
//!
//! Serves the aggregate numbers shown on the Opentribe marketplace pages
//! (bounty, grant and RFP totals plus the homepage bundle) and the token
//! exchange rates used to price rewards. Every response is computed from
//! persistence on a cache miss and served from a shared cache otherwise.

mod macros;

pub mod config;
pub mod db;
pub mod error;
pub mod exchange;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod stats;
pub mod telemetry;

// Re-export commonly used types
pub use config::{
    resolve_bind_addr, ApiConfig, CacheSettings, ExchangeRateConfig, StatsConfig, StatsEndpoint,
    StoreKind,
};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode, StatsFailure, StatsFailureBody};
pub use exchange::{CoinGeckoPriceSource, ExchangeRateService, ExchangeRates, PriceSource};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::{build_cache_backend, build_store, AppState};
