//! Opentribe API Server Entry Point
//!
//! Reads configuration from the environment, builds the store, cache and
//! price source, and starts the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use opentribe_api::telemetry::{init_tracer, TelemetryConfig};
use opentribe_api::{
    build_cache_backend, build_store, create_api_router, resolve_bind_addr, ApiConfig, ApiError,
    ApiResult, AppState, CacheSettings, CoinGeckoPriceSource, DbConfig, ExchangeRateConfig,
    StatsConfig, StoreKind,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let store = build_store(StoreKind::from_env(), &DbConfig::from_env())?;
    let cache_backend = build_cache_backend(&CacheSettings::from_env())?;

    let exchange_config = ExchangeRateConfig::from_env();
    let price_source = Arc::new(CoinGeckoPriceSource::new(&exchange_config)?);

    let state = AppState::new(
        store,
        cache_backend,
        StatsConfig::from_env(),
        exchange_config,
        price_source,
    );

    let api_config = ApiConfig::from_env();
    let app: Router = create_api_router(state, &api_config, &telemetry_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Opentribe API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
