//! Prometheus Metrics Definitions
//!
//! HTTP traffic plus the cache-aside behavior of the statistics and
//! exchange-rate endpoints. Exposed at `/metrics` for scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use opentribe_core::CacheError;
use opentribe_storage::CacheRead;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Compute latency buckets (seconds). Homepage snapshots fan out to a dozen
/// queries, so the tail reaches further than a single request.
const COMPUTE_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<OpentribeMetrics>> = Lazy::new(OpentribeMetrics::new);

/// Container for all Opentribe metrics.
#[derive(Clone)]
pub struct OpentribeMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Cache-aside reads - labels: key, outcome (hit/miss/bypass)
    pub stats_cache_events_total: CounterVec,

    /// Time spent computing a snapshot on miss or bypass - labels: key
    pub stats_compute_duration_seconds: HistogramVec,

    /// Swallowed cache failures - labels: key, operation (read/write)
    pub stats_cache_errors_total: CounterVec,
}

impl OpentribeMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "opentribe_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "opentribe_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            stats_cache_events_total: register_counter_vec!(
                "opentribe_stats_cache_events_total",
                "Cache-aside reads by outcome",
                &["key", "outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register stats_cache_events_total: {}", e)))?,

            stats_compute_duration_seconds: register_histogram_vec!(
                "opentribe_stats_compute_duration_seconds",
                "Snapshot compute duration in seconds",
                &["key"],
                COMPUTE_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register stats_compute_duration_seconds: {}", e)))?,

            stats_cache_errors_total: register_counter_vec!(
                "opentribe_stats_cache_errors_total",
                "Cache failures logged and ignored while serving",
                &["key", "operation"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register stats_cache_errors_total: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record how a cache-aside read was served.
    pub fn record_cache_read<T>(&self, key: &str, read: &CacheRead<T>) {
        self.stats_cache_events_total
            .with_label_values(&[key, read.outcome().as_str()])
            .inc();
        if let Some(secs) = read.compute_secs() {
            self.stats_compute_duration_seconds
                .with_label_values(&[key])
                .observe(secs);
        }
        for error in read.cache_errors() {
            self.stats_cache_errors_total
                .with_label_values(&[key, cache_operation(error)])
                .inc();
        }
    }
}

/// Which side of the cache-aside cycle a failure belongs to.
fn cache_operation(error: &CacheError) -> &'static str {
    match error {
        CacheError::Write { .. } | CacheError::Serialization { .. } => "write",
        CacheError::Connection(_)
        | CacheError::Read { .. }
        | CacheError::Corrupt { .. }
        | CacheError::LockPoisoned => "read",
    }
}

/// Record a cache-aside read on the global registry.
///
/// Metrics are best-effort: if registration failed at startup the read is
/// simply not counted.
pub fn record_cache_read<T>(key: &str, read: &CacheRead<T>) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_cache_read(key, read);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
