//! REST API Routes Module
//!
//! Route modules and the assembly of the full application router:
//! - `/api/v1/...`: statistics snapshots and exchange rates
//! - `/health/...`: probes
//! - `/metrics`: Prometheus scrape endpoint
//! - `/openapi.json`: OpenAPI document

pub mod exchange_rates;
pub mod health;
pub mod stats;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware, TelemetryConfig};

pub use exchange_rates::create_router as exchange_rates_router;
pub use health::create_router as health_router;
pub use stats::create_router as stats_router;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// CORS
// ============================================================================

/// Build the CORS layer.
///
/// No configured origins allows any origin (development). Otherwise only
/// listed origins pass, including `*.domain` wildcard entries.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if !config.is_production() {
        tracing::info!("CORS: Development mode - allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!(
        "CORS: Production mode - allowing origins: {:?}",
        config.cors_origins
    );
    let config = config.clone();
    cors.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _request| {
            origin
                .to_str()
                .map(|o| config.is_origin_allowed(o))
                .unwrap_or(false)
        },
    ))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
pub fn create_api_router(
    state: AppState,
    api_config: &ApiConfig,
    telemetry: &TelemetryConfig,
) -> Router {
    let api_routes = Router::new()
        .merge(stats::create_router())
        .merge(exchange_rates::create_router());

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router());

    if telemetry.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    router
        .with_state(state)
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cors_layer_builds_for_both_modes() {
        let _dev = build_cors_layer(&ApiConfig::default());
        let _prod = build_cors_layer(&ApiConfig {
            cors_origins: vec!["https://opentribe.io".to_string(), "*.opentribe.io".to_string()],
            cors_max_age_secs: 600,
        });
    }

    #[test]
    fn test_origin_header_values_parse() {
        let origin = HeaderValue::from_static("https://app.opentribe.io");
        let config = ApiConfig {
            cors_origins: vec!["*.opentribe.io".to_string()],
            cors_max_age_secs: 600,
        };
        assert!(config.is_origin_allowed(origin.to_str().unwrap()));
    }
}
