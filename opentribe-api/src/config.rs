//! API Configuration Module
//!
//! This module provides configuration for CORS, caching, the statistics
//! endpoints and the exchange-rate service. Configuration is loaded from
//! environment variables with sensible defaults for development.

use std::net::SocketAddr;
use std::time::Duration;

use opentribe_core::ConfigError;

/// Read and parse an environment variable, falling back to `default` when
/// it is unset or unparseable.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://opentribe.io,https://app.opentribe.io"
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(), // Empty = allow all
            cors_max_age_secs: 86400, // 24 hours
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `OPENTRIBE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `OPENTRIBE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("OPENTRIBE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cors_origins,
            cors_max_age_secs: env_or("OPENTRIBE_CORS_MAX_AGE_SECS", 86400),
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.opentribe.io
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Which cache backend to start with.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Redis URL. `None` selects the in-memory backend.
    pub redis_url: Option<String>,
    /// Maximum Redis connections.
    pub redis_pool_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_pool_size: 16,
        }
    }
}

impl CacheSettings {
    /// Environment variables:
    /// - `OPENTRIBE_REDIS_URL`: e.g. `redis://localhost:6379/0` (unset = in-memory)
    /// - `OPENTRIBE_REDIS_POOL_SIZE`: default 16
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("OPENTRIBE_REDIS_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            redis_pool_size: env_or("OPENTRIBE_REDIS_POOL_SIZE", 16),
        }
    }
}

// ============================================================================
// STATISTICS ENDPOINTS
// ============================================================================

/// Cache and HTTP caching parameters of one statistics endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsEndpoint {
    /// Cache key the snapshot is stored under.
    pub cache_key: &'static str,
    /// Cache TTL, also sent as `max-age`.
    pub ttl_secs: u64,
    /// Shared-cache lifetime sent as `s-maxage`.
    pub s_maxage_secs: u64,
    /// Fixed `error` text of the failure envelope.
    pub failure_message: &'static str,
}

impl StatsEndpoint {
    /// `Cache-Control` header value for a successful response.
    pub fn cache_control(&self) -> String {
        format!("s-maxage={}, max-age={}", self.s_maxage_secs, self.ttl_secs)
    }
}

/// Parameters of all four statistics endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    pub bounties: StatsEndpoint,
    pub grants: StatsEndpoint,
    pub rfps: StatsEndpoint,
    pub homepage: StatsEndpoint,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            bounties: StatsEndpoint {
                cache_key: "bounties:stats",
                ttl_secs: 600,
                s_maxage_secs: 1800,
                failure_message: "Failed to fetch bounty statistics",
            },
            grants: StatsEndpoint {
                cache_key: "grants:stats",
                ttl_secs: 600,
                s_maxage_secs: 1800,
                failure_message: "Failed to fetch grant statistics",
            },
            rfps: StatsEndpoint {
                cache_key: "rfps:stats",
                ttl_secs: 1800,
                s_maxage_secs: 3600,
                failure_message: "Failed to fetch RFP statistics",
            },
            homepage: StatsEndpoint {
                cache_key: "homepage:stats",
                ttl_secs: 300,
                s_maxage_secs: 1800,
                failure_message: "Failed to fetch homepage statistics",
            },
        }
    }
}

impl StatsConfig {
    /// Defaults with TTL overrides from:
    /// - `OPENTRIBE_STATS_TTL_BOUNTIES` (600)
    /// - `OPENTRIBE_STATS_TTL_GRANTS` (600)
    /// - `OPENTRIBE_STATS_TTL_RFPS` (1800)
    /// - `OPENTRIBE_STATS_TTL_HOMEPAGE` (300)
    ///
    /// A zero TTL is ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        for (key, endpoint) in [
            ("OPENTRIBE_STATS_TTL_BOUNTIES", &mut config.bounties),
            ("OPENTRIBE_STATS_TTL_GRANTS", &mut config.grants),
            ("OPENTRIBE_STATS_TTL_RFPS", &mut config.rfps),
            ("OPENTRIBE_STATS_TTL_HOMEPAGE", &mut config.homepage),
        ] {
            let ttl = env_or(key, endpoint.ttl_secs);
            if ttl > 0 {
                endpoint.ttl_secs = ttl;
            }
        }
        config
    }
}

// ============================================================================
// EXCHANGE RATES
// ============================================================================

/// Default third-party price endpoint.
pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Configuration of the exchange-rate service.
#[derive(Debug, Clone)]
pub struct ExchangeRateConfig {
    /// Simple-price endpoint URL.
    pub api_url: String,
    /// Optional API key sent as `x-cg-demo-api-key`.
    pub api_key: Option<String>,
    /// Cache TTL for fetched rates, also sent as `max-age`.
    pub ttl_secs: u64,
    /// Shared-cache lifetime sent as `s-maxage`.
    pub s_maxage_secs: u64,
    /// Upstream request timeout.
    pub request_timeout: Duration,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PRICE_API_URL.to_string(),
            api_key: None,
            ttl_secs: 300,
            s_maxage_secs: 600,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ExchangeRateConfig {
    /// Environment variables:
    /// - `OPENTRIBE_PRICE_API_URL`
    /// - `OPENTRIBE_PRICE_API_KEY`
    /// - `OPENTRIBE_EXCHANGE_RATE_TTL` (300)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("OPENTRIBE_PRICE_API_URL").unwrap_or(defaults.api_url),
            api_key: std::env::var("OPENTRIBE_PRICE_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            ttl_secs: env_or("OPENTRIBE_EXCHANGE_RATE_TTL", defaults.ttl_secs).max(1),
            ..defaults
        }
    }

    pub fn cache_control(&self) -> String {
        format!("s-maxage={}, max-age={}", self.s_maxage_secs, self.ttl_secs)
    }
}

// ============================================================================
// SERVER
// ============================================================================

/// Which statistics store the server starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl StoreKind {
    /// `OPENTRIBE_STORE=memory` selects the in-memory store.
    pub fn from_env() -> Self {
        match std::env::var("OPENTRIBE_STORE") {
            Ok(value) if value.eq_ignore_ascii_case("memory") => StoreKind::Memory,
            _ => StoreKind::Postgres,
        }
    }
}

/// Resolve the listen address from `OPENTRIBE_API_BIND` and
/// `PORT`/`OPENTRIBE_API_PORT`.
pub fn resolve_bind_addr() -> Result<SocketAddr, ConfigError> {
    let host = std::env::var("OPENTRIBE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("OPENTRIBE_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    bind_addr(&host, &port_str)
}

fn bind_addr(host: &str, port_str: &str) -> Result<SocketAddr, ConfigError> {
    let port = port_str
        .trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "PORT".to_string(),
            value: port_str.to_string(),
            reason: e.to_string(),
        })?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "OPENTRIBE_API_BIND".to_string(),
            value: host.to_string(),
            reason: e.to_string(),
        })
}
