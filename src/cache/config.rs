//! Configuration for cache wrappers

use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default TTL for entries written by a cache wrapper.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Base namespace for randomly generated prefixes.
pub const DEFAULT_BASE_PREFIX: &str = "cachette:";

/// Default number of attempts when reserving a random prefix.
pub const DEFAULT_KEY_ATTEMPTS: u32 = 3;

/// Settings shared by cache wrappers and repositories built from them.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied to entries written on a miss; `None` falls through to
    /// the repository default (two weeks)
    pub default_ttl: Option<Duration>,

    /// Fixed key prefix. `None` means a fresh random prefix is reserved at
    /// construction time; such a cache is effectively scoped to the
    /// process lifetime, since nothing persists the prefix.
    pub key_prefix: Option<String>,

    /// Namespace under which random prefixes are drawn
    pub base_prefix: String,

    /// Retry budget for random prefix reservation
    pub key_attempts: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(DEFAULT_CACHE_TTL),
            key_prefix: None,
            base_prefix: DEFAULT_BASE_PREFIX.to_string(),
            key_attempts: DEFAULT_KEY_ATTEMPTS,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.key_attempts == 0 {
            return Err(CacheError::Config(
                "key_attempts must be at least 1".to_string(),
            ));
        }

        if self.base_prefix.is_empty() {
            return Err(CacheError::Config(
                "base_prefix must not be empty".to_string(),
            ));
        }

        if let Some(prefix) = &self.key_prefix {
            if prefix.is_empty() {
                return Err(CacheError::Config(
                    "key_prefix must not be empty when given".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for [`CacheConfig`].
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    default_ttl: Option<Option<Duration>>,
    key_prefix: Option<String>,
    base_prefix: Option<String>,
    key_attempts: Option<u32>,
}

impl CacheConfigBuilder {
    /// Set the TTL written on every miss.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(Some(ttl));
        self
    }

    /// Let written entries fall through to the repository default TTL.
    pub fn repository_default_ttl(mut self) -> Self {
        self.default_ttl = Some(None);
        self
    }

    /// Pin the key prefix instead of generating a random one.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the namespace for random prefixes.
    pub fn base_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.base_prefix = Some(prefix.into());
        self
    }

    /// Set the retry budget for random prefix reservation.
    pub fn key_attempts(mut self, attempts: u32) -> Self {
        self.key_attempts = Some(attempts);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<CacheConfig> {
        let defaults = CacheConfig::default();

        let config = CacheConfig {
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            key_prefix: self.key_prefix,
            base_prefix: self.base_prefix.unwrap_or(defaults.base_prefix),
            key_attempts: self.key_attempts.unwrap_or(defaults.key_attempts),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.base_prefix, "cachette:");
        assert_eq!(config.key_attempts, 3);
        assert!(config.key_prefix.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::builder()
            .default_ttl(Duration::from_secs(900))
            .key_prefix("quotes")
            .key_attempts(5)
            .build()
            .unwrap();

        assert_eq!(config.default_ttl, Some(Duration::from_secs(900)));
        assert_eq!(config.key_prefix.as_deref(), Some("quotes"));
        assert_eq!(config.key_attempts, 5);
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let err = CacheConfig::builder().key_attempts(0).build().unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[test]
    fn test_validation_rejects_empty_prefixes() {
        let err = CacheConfig::builder().base_prefix("").build().unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));

        let err = CacheConfig::builder().key_prefix("").build().unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }
}
