//! Exchange-rate REST API Route

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use opentribe_core::PriceError;
use serde::Deserialize;

use crate::config::ExchangeRateConfig;
use crate::error::{ApiError, StatsFailure};
use crate::exchange::ExchangeRateService;
use crate::state::AppState;

/// Fixed `error` text when the price source fails.
pub const EXCHANGE_RATE_FAILURE: &str = "Failed to fetch exchange rates";

/// Token requested when `tokens` is absent or empty.
pub const DEFAULT_TOKEN: &str = "DOT";

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ExchangeRateQuery {
    /// Comma-separated token symbols, e.g. `DOT,USDC`. Defaults to `DOT`.
    pub tokens: Option<String>,
    /// `true` refetches prices instead of reading the cache.
    pub refresh: Option<String>,
}

impl ExchangeRateQuery {
    pub fn symbols(&self) -> Vec<String> {
        let symbols: Vec<String> = self
            .tokens
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if symbols.is_empty() {
            vec![DEFAULT_TOKEN.to_string()]
        } else {
            symbols
        }
    }

    pub fn bypass(&self) -> bool {
        self.refresh.as_deref() == Some("true")
    }
}

/// Get USD exchange rates.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/exchange-rates",
    tag = "Exchange Rates",
    params(ExchangeRateQuery),
    responses(
        (status = 200, description = "USD price per token", body = crate::exchange::ExchangeRates),
        (status = 400, description = "Unsupported token", body = ApiError),
        (status = 502, description = "Price source failed", body = crate::error::StatsFailureBody),
    ),
))]
pub async fn exchange_rates(
    State(service): State<Arc<ExchangeRateService>>,
    State(config): State<Arc<ExchangeRateConfig>>,
    query: Option<Query<ExchangeRateQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let symbols = query.symbols();

    match service.rates(&symbols, query.bypass()).await {
        Ok(rates) => (
            [(header::CACHE_CONTROL, config.cache_control())],
            Json(rates),
        )
            .into_response(),
        Err(e @ PriceError::UnsupportedToken(_)) => ApiError::from(e).into_response(),
        Err(e) => {
            tracing::error!(error = %e, tokens = ?symbols, "{}", EXCHANGE_RATE_FAILURE);
            StatsFailure::upstream(EXCHANGE_RATE_FAILURE, &e).into_response()
        }
    }
}

/// Create the exchange-rate router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/exchange-rates", get(exchange_rates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(tokens: Option<&str>) -> ExchangeRateQuery {
        ExchangeRateQuery {
            tokens: tokens.map(str::to_string),
            refresh: None,
        }
    }

    #[test]
    fn test_symbols_default_to_dot() {
        assert_eq!(query(None).symbols(), vec!["DOT"]);
        assert_eq!(query(Some("")).symbols(), vec!["DOT"]);
        assert_eq!(query(Some(" , ")).symbols(), vec!["DOT"]);
    }

    #[test]
    fn test_symbols_split_and_trim() {
        assert_eq!(query(Some("DOT, usdc")).symbols(), vec!["DOT", "usdc"]);
    }
}
