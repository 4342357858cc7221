//! Statistics REST API Routes
//!
//! Four read-only snapshots served cache-aside. A request with
//! `?refresh=true` skips the cache read but still refreshes the stored
//! snapshot. Successful responses carry `Cache-Control` so shared caches in
//! front of the API can hold them longer than the backend cache does.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use opentribe_core::{BountyStats, GrantStats, HomepageStats, RfpStats, StorageResult};
use opentribe_storage::{StatsCache, StatsStore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::{StatsConfig, StatsEndpoint};
use crate::error::StatsFailure;
use crate::state::AppState;
use crate::stats::{
    compute_bounty_stats, compute_grant_stats, compute_homepage_stats, compute_rfp_stats,
};
use crate::telemetry::record_cache_read;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// Query parameters accepted by every statistics endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct RefreshQuery {
    /// `true` recomputes the snapshot instead of reading the cache.
    pub refresh: Option<String>,
}

impl RefreshQuery {
    /// Only the exact value `true` bypasses the cache.
    pub fn bypass(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }
}

/// Resolve the bypass flag. A query string that fails to parse is treated
/// like an absent one.
pub fn refresh_requested(query: Option<&RefreshQuery>) -> bool {
    query.map(RefreshQuery::bypass).unwrap_or(false)
}

/// Homepage response: the snapshot is wrapped in `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HomepageStatsResponse {
    pub data: HomepageStats,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Serve one snapshot cache-aside, rendering compute failures as the
/// endpoint's failure envelope.
async fn cached_snapshot<T, F, Fut>(
    cache: &StatsCache,
    endpoint: &StatsEndpoint,
    bypass: bool,
    compute: F,
) -> Result<T, StatsFailure>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    match cache
        .get_or_compute(endpoint.cache_key, endpoint.ttl_secs, bypass, compute)
        .await
    {
        Ok(read) => {
            record_cache_read(endpoint.cache_key, &read);
            tracing::debug!(
                key = endpoint.cache_key,
                outcome = read.outcome().as_str(),
                "Served statistics snapshot"
            );
            Ok(read.into_value())
        }
        Err(e) => {
            tracing::error!(
                key = endpoint.cache_key,
                error = %e,
                "{}",
                endpoint.failure_message
            );
            Err(StatsFailure::compute(endpoint.failure_message, &e))
        }
    }
}

fn cached_response<B: Serialize>(endpoint: &StatsEndpoint, body: B) -> Response {
    (
        [(header::CACHE_CONTROL, endpoint.cache_control())],
        Json(body),
    )
        .into_response()
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// Get bounty statistics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/bounties/stats",
    tag = "Statistics",
    params(RefreshQuery),
    responses(
        (status = 200, description = "Bounty statistics", body = BountyStats),
        (status = 500, description = "Statistics could not be computed", body = crate::error::StatsFailureBody),
    ),
))]
pub async fn bounty_stats(
    State(store): State<Arc<dyn StatsStore>>,
    State(cache): State<StatsCache>,
    State(config): State<Arc<StatsConfig>>,
    query: Option<Query<RefreshQuery>>,
) -> Result<Response, StatsFailure> {
    let endpoint = &config.bounties;
    let bypass = refresh_requested(query.as_deref());
    let stats: BountyStats =
        cached_snapshot(&cache, endpoint, bypass, || compute_bounty_stats(store.as_ref())).await?;
    Ok(cached_response(endpoint, stats))
}

/// Get grant statistics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/grants/stats",
    tag = "Statistics",
    params(RefreshQuery),
    responses(
        (status = 200, description = "Grant statistics", body = GrantStats),
        (status = 500, description = "Statistics could not be computed", body = crate::error::StatsFailureBody),
    ),
))]
pub async fn grant_stats(
    State(store): State<Arc<dyn StatsStore>>,
    State(cache): State<StatsCache>,
    State(config): State<Arc<StatsConfig>>,
    query: Option<Query<RefreshQuery>>,
) -> Result<Response, StatsFailure> {
    let endpoint = &config.grants;
    let bypass = refresh_requested(query.as_deref());
    let stats: GrantStats =
        cached_snapshot(&cache, endpoint, bypass, || compute_grant_stats(store.as_ref())).await?;
    Ok(cached_response(endpoint, stats))
}

/// Get RFP statistics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/rfps/stats",
    tag = "Statistics",
    params(RefreshQuery),
    responses(
        (status = 200, description = "RFP statistics", body = RfpStats),
        (status = 500, description = "Statistics could not be computed", body = crate::error::StatsFailureBody),
    ),
))]
pub async fn rfp_stats(
    State(store): State<Arc<dyn StatsStore>>,
    State(cache): State<StatsCache>,
    State(config): State<Arc<StatsConfig>>,
    query: Option<Query<RefreshQuery>>,
) -> Result<Response, StatsFailure> {
    let endpoint = &config.rfps;
    let bypass = refresh_requested(query.as_deref());
    let stats: RfpStats =
        cached_snapshot(&cache, endpoint, bypass, || compute_rfp_stats(store.as_ref())).await?;
    Ok(cached_response(endpoint, stats))
}

/// Get the homepage statistics bundle.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/home/stats",
    tag = "Statistics",
    params(RefreshQuery),
    responses(
        (status = 200, description = "Homepage statistics", body = HomepageStatsResponse),
        (status = 500, description = "Statistics could not be computed", body = crate::error::StatsFailureBody),
    ),
))]
pub async fn homepage_stats(
    State(store): State<Arc<dyn StatsStore>>,
    State(cache): State<StatsCache>,
    State(config): State<Arc<StatsConfig>>,
    query: Option<Query<RefreshQuery>>,
) -> Result<Response, StatsFailure> {
    let endpoint = &config.homepage;
    let bypass = refresh_requested(query.as_deref());
    let data: HomepageStats =
        cached_snapshot(&cache, endpoint, bypass, || compute_homepage_stats(store.as_ref()))
            .await?;
    Ok(cached_response(endpoint, HomepageStatsResponse { data }))
}

/// Plain `OPTIONS` on a statistics path: empty 200.
pub async fn options_ok() -> StatusCode {
    StatusCode::OK
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the statistics routes router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/bounties/stats", get(bounty_stats).options(options_ok))
        .route("/grants/stats", get(grant_stats).options(options_ok))
        .route("/rfps/stats", get(rfp_stats).options(options_ok))
        .route("/home/stats", get(homepage_stats).options(options_ok))
}
