//! Error types for cache operations
//!
//! This module defines the error taxonomy for the cachette library. Absence
//! of a cached value is never an error; every operation that can miss
//! returns `Ok(None)` instead.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid wrapper or repository configuration; raised at construction
    /// time, before any store round trip
    #[error("Configuration error: {0}")]
    Config(String),

    /// Random key generation exhausted its retry budget. Signals a
    /// misconfigured keyspace or store connection, not a recoverable
    /// runtime condition.
    #[error("Random key generation exhausted after {attempts} attempts")]
    KeyCollision { attempts: u32 },

    /// A value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Redis driver error (wrapper); never retried by this layer
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// The store could not be reached at all
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::Config("prefix must not be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: prefix must not be empty"
        );

        let collision = CacheError::KeyCollision { attempts: 3 };
        assert!(collision.to_string().contains("after 3 attempts"));

        let serialization = CacheError::Serialization("not JSON-encodable".to_string());
        assert!(serialization.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_error_conversion() {
        let error: CacheError = "test error".into();
        assert!(matches!(error, CacheError::Other(_)));

        let error: CacheError = "test error".to_string().into();
        assert!(matches!(error, CacheError::Other(_)));
    }
}
