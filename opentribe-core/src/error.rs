//! Error types for Opentribe operations

use thiserror::Error;

/// Persistence layer errors.
///
/// `Query` and `Connection` carry the collaborator's message verbatim so the
/// HTTP layer can surface it as the failure detail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{0}")]
    Query(String),

    #[error("{0}")]
    Connection(String),

    #[error("Invalid {column} in row: {reason}")]
    InvalidRow { column: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    /// A failure raised without any diagnostic message.
    #[error("Unknown error")]
    Opaque,
}

impl StorageError {
    /// The diagnostic message, if the failure carries one.
    pub fn message(&self) -> Option<String> {
        match self {
            StorageError::Opaque => None,
            other => Some(other.to_string()),
        }
    }
}

/// Result type alias for persistence queries.
pub type StorageResult<T> = Result<T, StorageError>;

/// Cache collaborator errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache read failed for {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Cache write failed for {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Cached value for {key} is not valid JSON: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Failed to serialize value for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Third-party pricing API errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("Unsupported token: {0}")]
    UnsupportedToken(String),

    #[error("Price API request failed: {0}")]
    RequestFailed(String),

    #[error("Price API returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Invalid response from price API: {reason}")]
    InvalidResponse { reason: String },
}

/// Master error type for all Opentribe errors.
#[derive(Debug, Clone, Error)]
pub enum OpentribeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Price error: {0}")]
    Price(#[from] PriceError),
}

/// Result type alias for Opentribe operations.
pub type OpentribeResult<T> = Result<T, OpentribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_displays_message_verbatim() {
        let err = StorageError::Query("Database connection failed".to_string());
        assert_eq!(err.to_string(), "Database connection failed");
        assert_eq!(err.message().as_deref(), Some("Database connection failed"));
    }

    #[test]
    fn test_opaque_error_has_no_message() {
        assert_eq!(StorageError::Opaque.message(), None);
        assert_eq!(StorageError::Opaque.to_string(), "Unknown error");
    }

    #[test]
    fn test_cache_error_display_names_key() {
        let err = CacheError::Write {
            key: "bounties:stats".to_string(),
            reason: "connection reset".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bounties:stats"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_price_error_display_status() {
        let err = PriceError::UpstreamStatus {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_opentribe_error_from_variants() {
        let storage = OpentribeError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, OpentribeError::Storage(_)));

        let cache = OpentribeError::from(CacheError::LockPoisoned);
        assert!(matches!(cache, OpentribeError::Cache(_)));

        let config = OpentribeError::from(ConfigError::MissingRequired {
            field: "OPENTRIBE_DB_HOST".to_string(),
        });
        assert!(matches!(config, OpentribeError::Config(_)));

        let price = OpentribeError::from(PriceError::UnsupportedToken("XYZ".to_string()));
        assert!(matches!(price, OpentribeError::Price(_)));
    }
}
