//! Shared harness for router-level tests.
//!
//! Builds the real application router over injected doubles and drives it
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use opentribe_api::telemetry::TelemetryConfig;
use opentribe_api::{create_api_router, ApiConfig, AppState, ExchangeRateConfig, PriceSource, StatsConfig};
use opentribe_core::PriceError;
use opentribe_storage::StatsStore;
use opentribe_test_utils::{RecordingCacheBackend, StubStatsStore};
use serde_json::Value;
use tower::ServiceExt;

/// Price source with fixed quotes and a failure switch.
#[derive(Default)]
pub struct StubPriceSource {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl PriceSource for StubPriceSource {
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<BTreeMap<String, f64>, PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PriceError::RequestFailed("connection reset by peer".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| match id.as_str() {
                "polkadot" => Some((id.clone(), 4.21)),
                "usd-coin" => Some((id.clone(), 1.0)),
                "tether" => Some((id.clone(), 0.9998)),
                _ => None,
            })
            .collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub cache: Arc<RecordingCacheBackend>,
    pub prices: Arc<StubPriceSource>,
}

/// Router over a stub store, a recording cache and stub prices.
pub fn app_with(store: Arc<StubStatsStore>) -> TestApp {
    app_with_store(store)
}

/// Router over any store implementation.
pub fn app_with_store(store: Arc<dyn StatsStore>) -> TestApp {
    let cache = Arc::new(RecordingCacheBackend::new());
    let prices = Arc::new(StubPriceSource::default());
    let state = AppState::new(
        store,
        cache.clone(),
        StatsConfig::default(),
        ExchangeRateConfig::default(),
        prices.clone(),
    );
    let router = create_api_router(state, &ApiConfig::default(), &TelemetryConfig::default());
    TestApp {
        router,
        cache,
        prices,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is not UTF-8")
    }

    pub fn cache_control(&self) -> Option<&str> {
        self.headers
            .get("cache-control")
            .and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body")
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri).await
    }
}
