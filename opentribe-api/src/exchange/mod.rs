//! Exchange-rate service.
//!
//! Fetches USD prices for the tokens bounties and grants are denominated in
//! and caches them through the same cache-aside helper the statistics
//! endpoints use. Rates are keyed by the sorted set of price ids requested.

pub mod coingecko;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use opentribe_core::PriceError;
use opentribe_storage::{CacheRead, StatsCache};
use serde::{Deserialize, Serialize};

pub use coingecko::CoinGeckoPriceSource;

use crate::telemetry::metrics::record_cache_read;

/// Symbol → price id of every supported token.
pub const SUPPORTED_TOKENS: &[(&str, &str)] = &[
    ("DOT", "polkadot"),
    ("KSM", "kusama"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
];

/// Cache key prefix for fetched rates.
pub const CACHE_KEY_PREFIX: &str = "exchange-rates";

/// Resolve a token symbol (case-insensitive) to its price id.
pub fn price_id(symbol: &str) -> Result<&'static str, PriceError> {
    let normalized = symbol.trim().to_ascii_uppercase();
    SUPPORTED_TOKENS
        .iter()
        .find(|(known, _)| *known == normalized)
        .map(|(_, id)| *id)
        .ok_or_else(|| PriceError::UnsupportedToken(symbol.trim().to_string()))
}

/// Third-party source of USD prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price per price id. Ids the source does not know are omitted.
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<BTreeMap<String, f64>, PriceError>;
}

/// Body of `GET /api/v1/exchange-rates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ExchangeRates {
    /// USD price per requested symbol.
    pub rates: BTreeMap<String, f64>,
    /// Always `"USD"`.
    pub currency: String,
}

/// Cached exchange-rate lookups.
#[derive(Clone)]
pub struct ExchangeRateService {
    cache: StatsCache,
    source: Arc<dyn PriceSource>,
    ttl_secs: u64,
}

impl ExchangeRateService {
    pub fn new(cache: StatsCache, source: Arc<dyn PriceSource>, ttl_secs: u64) -> Self {
        Self {
            cache,
            source,
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// USD rates for `symbols`.
    ///
    /// Every symbol is validated before anything is fetched. Symbols the
    /// source has no price for are left out of the result.
    pub async fn rates(&self, symbols: &[String], bypass: bool) -> Result<ExchangeRates, PriceError> {
        let mut requested: BTreeMap<String, &'static str> = BTreeMap::new();
        for symbol in symbols {
            let id = price_id(symbol)?;
            requested.insert(symbol.trim().to_ascii_uppercase(), id);
        }

        let mut ids: Vec<String> = requested.values().map(|id| id.to_string()).collect();
        ids.sort();
        ids.dedup();
        let key = format!("{}:{}", CACHE_KEY_PREFIX, ids.join(","));

        let source = Arc::clone(&self.source);
        let read: CacheRead<BTreeMap<String, f64>> = self
            .cache
            .get_or_compute(&key, self.ttl_secs, bypass, || async move {
                source.fetch_usd_prices(&ids).await
            })
            .await?;
        record_cache_read(CACHE_KEY_PREFIX, &read);

        let prices = read.into_value();
        let rates = requested
            .into_iter()
            .filter_map(|(symbol, id)| prices.get(id).map(|price| (symbol, *price)))
            .collect();

        Ok(ExchangeRates {
            rates,
            currency: "USD".to_string(),
        })
    }

    /// Convert `amount` of `symbol` to USD at the current rate.
    pub async fn convert_to_usd(&self, symbol: &str, amount: f64) -> Result<f64, PriceError> {
        let quote = self.rates(&[symbol.to_string()], false).await?;
        let normalized = symbol.trim().to_ascii_uppercase();
        quote
            .rates
            .get(&normalized)
            .map(|rate| rate * amount)
            .ok_or_else(|| PriceError::InvalidResponse {
                reason: format!("no USD price for {}", normalized),
            })
    }
}
