//! OpenAPI Specification for the Opentribe API
//!
//! Built with utoipa from the route annotations and the snapshot types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode, StatsFailureBody};
use crate::exchange::ExchangeRates;
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::stats::HomepageStatsResponse;
use crate::routes::{exchange_rates, health, stats};
use crate::telemetry::metrics;

use opentribe_core::{
    ActivityActor, ActivityEvent, ActivityKind, ActivityTarget, BountyStats, FeaturedOrganization,
    GrantStats, HomepageStats, HomepageTotals, OpportunityKind, RfpStats, SkillCount,
};

/// OpenAPI document for the Opentribe API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Opentribe API",
        version = "0.1.0",
        description = "Cached marketplace statistics and token exchange rates for the Opentribe web clients",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Statistics", description = "Aggregate marketplace snapshots, served cache-aside"),
        (name = "Exchange Rates", description = "USD prices of the tokens rewards are paid in"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        stats::bounty_stats,
        stats::grant_stats,
        stats::rfp_stats,
        stats::homepage_stats,
        exchange_rates::exchange_rates,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        BountyStats,
        GrantStats,
        RfpStats,
        HomepageStats,
        HomepageTotals,
        HomepageStatsResponse,
        FeaturedOrganization,
        SkillCount,
        ActivityEvent,
        ActivityActor,
        ActivityTarget,
        ActivityKind,
        OpportunityKind,
        ExchangeRates,
        StatsFailureBody,
        ApiError,
        ErrorCode,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
    ))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
