//! Router-level tests for probes, `/metrics` and `/openapi.json`.

use std::sync::Arc;

use axum::http::StatusCode;
use opentribe_core::StorageError;
use opentribe_test_utils::{StubQuery, StubStatsStore};

mod test_support;
use test_support::app_with;

#[tokio::test]
async fn ping_answers_pong() {
    let app = app_with(Arc::new(StubStatsStore::new()));

    let res = app.get("/health/ping").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "pong");
}

#[tokio::test]
async fn liveness_is_healthy() {
    let app = app_with(Arc::new(StubStatsStore::new()));

    let res = app.get("/health/live").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["status"], "healthy");
}

#[tokio::test]
async fn readiness_reports_components() {
    let app = app_with(Arc::new(StubStatsStore::new()));

    let res = app.get("/health/ready").await;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["database"]["status"], "healthy");
    assert_eq!(body["details"]["cache"]["status"], "healthy");
    assert_eq!(body["details"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_fails_when_cache_is_down() {
    let app = app_with(Arc::new(StubStatsStore::new()));
    app.cache.fail_reads(true);

    let res = app.get("/health/ready").await;

    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    let body = res.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["details"]["database"]["status"], "healthy");
    assert_eq!(body["details"]["cache"]["status"], "unhealthy");
    assert!(body["details"]["cache"]["error"].is_string());
}

#[tokio::test]
async fn readiness_fails_when_database_is_down() {
    let store = StubStatsStore::new().failing(
        StubQuery::Ping,
        StorageError::Connection("connection refused".to_string()),
    );
    let app = app_with(Arc::new(store));

    let res = app.get("/health/ready").await;

    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    let body = res.json();
    assert_eq!(body["details"]["database"]["status"], "unhealthy");
    assert_eq!(body["details"]["cache"]["status"], "healthy");
}

#[tokio::test]
async fn metrics_are_exposed_after_traffic() {
    let app = app_with(Arc::new(StubStatsStore::new()));
    app.get("/api/v1/bounties/stats").await;

    let res = app.get("/metrics").await;

    assert_eq!(res.status, StatusCode::OK);
    let text = res.text();
    assert!(text.contains("opentribe_http_requests_total"));
    assert!(text.contains("opentribe_stats_cache_events_total"));
}

#[cfg(feature = "openapi")]
#[tokio::test]
async fn openapi_document_lists_stats_paths() {
    let app = app_with(Arc::new(StubStatsStore::new()));

    let res = app.get("/openapi.json").await;

    assert_eq!(res.status, StatusCode::OK);
    let paths = &res.json()["paths"];
    for path in [
        "/api/v1/bounties/stats",
        "/api/v1/grants/stats",
        "/api/v1/rfps/stats",
        "/api/v1/home/stats",
        "/api/v1/exchange-rates",
    ] {
        assert!(paths.get(path).is_some(), "missing {}", path);
    }
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app_with(Arc::new(StubStatsStore::new()));

    let res = app.get("/api/v1/bounties/unknown").await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
