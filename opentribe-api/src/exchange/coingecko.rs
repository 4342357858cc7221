//! CoinGecko `simple/price` client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use opentribe_core::PriceError;
use serde_json::Value;

use super::PriceSource;
use crate::config::ExchangeRateConfig;

/// Header carrying the optional demo API key.
pub const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Price source backed by the CoinGecko `simple/price` endpoint.
#[derive(Clone)]
pub struct CoinGeckoPriceSource {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl CoinGeckoPriceSource {
    pub fn new(config: &ExchangeRateConfig) -> Result<Self, PriceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PriceError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoPriceSource {
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<BTreeMap<String, f64>, PriceError> {
        let joined = ids.join(",");
        let mut request = self
            .client
            .get(&self.api_url)
            .query(&[("ids", joined.as_str()), ("vs_currencies", "usd")]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PriceError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| String::new());
            return Err(PriceError::UpstreamStatus {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PriceError::InvalidResponse { reason: e.to_string() })?;
        parse_simple_price(&body)
    }
}

/// Parse `{"polkadot": {"usd": 4.2}, ...}` into id → USD price.
///
/// Entries without a numeric `usd` field are skipped.
pub fn parse_simple_price(body: &Value) -> Result<BTreeMap<String, f64>, PriceError> {
    let entries = body.as_object().ok_or_else(|| PriceError::InvalidResponse {
        reason: "expected a JSON object".to_string(),
    })?;

    Ok(entries
        .iter()
        .filter_map(|(id, quote)| {
            quote
                .get("usd")
                .and_then(Value::as_f64)
                .map(|usd| (id.clone(), usd))
        })
        .collect())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
