//! Repository for externally-encoded response payloads

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::store::StoreBackend;

use super::{KeyedStore, Repository, ValueStore};

/// A response value that carries its own canonical payload encoding.
///
/// Handler results are stored and replayed through this form instead of the
/// generic serializer, so the cached bytes match what the handler would
/// have sent.
pub trait CacheableResponse: Send + Sync + Sized {
    /// The canonical payload of this response.
    fn response_body(&self) -> Result<String>;

    /// Rebuild a response from a stored payload.
    fn from_response_body(raw: &str) -> Result<Self>;
}

/// A [`Repository`] that encodes values through [`CacheableResponse`].
pub struct ResponseRepository {
    inner: Repository,
}

impl ResponseRepository {
    pub fn new(store: Arc<dyn StoreBackend>, prefix: impl Into<String>) -> Self {
        Self {
            inner: Repository::new(store, prefix),
        }
    }

    /// Wrap an existing repository, keeping its prefix.
    pub fn from_repository(inner: Repository) -> Self {
        Self { inner }
    }

    pub fn prefix(&self) -> &str {
        self.inner.prefix()
    }

    pub async fn get<T: CacheableResponse>(&self, key: impl fmt::Display) -> Result<Option<T>> {
        match self.inner.raw_get(key).await? {
            Some(raw) => Ok(Some(T::from_response_body(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save<T: CacheableResponse>(
        &self,
        key: impl fmt::Display,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let encoded = value.response_body()?;
        self.inner.raw_save(key, &encoded, ttl).await
    }

    pub async fn delete(&self, key: impl fmt::Display) -> Result<()> {
        self.inner.delete(key).await
    }

    pub async fn exists(&self, key: impl fmt::Display) -> Result<bool> {
        self.inner.exists(key).await
    }

    pub async fn expire(&self, key: impl fmt::Display, ttl: Duration) -> Result<bool> {
        self.inner.expire(key, ttl).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    pub async fn clear(&self) -> Result<u64> {
        self.inner.clear().await
    }
}

#[async_trait]
impl KeyedStore for ResponseRepository {
    async fn remove(&self, local_key: &str) -> Result<()> {
        self.delete(local_key).await
    }

    async fn live_count(&self) -> Result<u64> {
        self.count().await
    }

    async fn clear_all(&self) -> Result<u64> {
        self.clear().await
    }
}

#[async_trait]
impl<T: CacheableResponse + 'static> ValueStore<T> for ResponseRepository {
    async fn load(&self, local_key: &str) -> Result<Option<T>> {
        self.get(local_key).await
    }

    async fn store(&self, local_key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        self.save(local_key, value, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::store::MemoryBackend;

    #[derive(Debug, Clone, PartialEq)]
    struct TextResponse {
        body: String,
    }

    impl CacheableResponse for TextResponse {
        fn response_body(&self) -> Result<String> {
            Ok(self.body.clone())
        }

        fn from_response_body(raw: &str) -> Result<Self> {
            Ok(Self {
                body: raw.to_string(),
            })
        }
    }

    #[derive(Debug)]
    struct BrokenResponse;

    impl CacheableResponse for BrokenResponse {
        fn response_body(&self) -> Result<String> {
            Err(CacheError::Serialization(
                "response payload unavailable".to_string(),
            ))
        }

        fn from_response_body(_raw: &str) -> Result<Self> {
            Ok(Self)
        }
    }

    fn repository() -> ResponseRepository {
        ResponseRepository::new(Arc::new(MemoryBackend::new()), "resp:")
    }

    #[tokio::test]
    async fn test_payload_round_trip() {
        let repo = repository();
        let response = TextResponse {
            body: r#"{"status":"ok"}"#.to_string(),
        };

        repo.save("home", &response, None).await.unwrap();
        assert_eq!(repo.get::<TextResponse>("home").await.unwrap(), Some(response));
    }

    #[tokio::test]
    async fn test_payload_is_stored_verbatim() {
        let repo = repository();
        let response = TextResponse {
            body: "plain text, not JSON".to_string(),
        };

        repo.save("page", &response, None).await.unwrap();

        // The raw entry is the handler payload itself, not a JSON wrapper.
        let raw = repo.inner.raw_get("page").await.unwrap();
        assert_eq!(raw.as_deref(), Some("plain text, not JSON"));
    }

    #[tokio::test]
    async fn test_encoding_failure_surfaces() {
        let repo = repository();
        let err = repo.save("broken", &BrokenResponse, None).await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert!(!repo.exists("broken").await.unwrap());
    }
}
