//! Repository bound to one structured domain type

use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::serialize::Model;
use crate::store::StoreBackend;

use super::{KeyedStore, Repository, ValueStore};

/// A [`Repository`] specialized to one [`Model`] type.
///
/// Values go through the model's canonical encoding in both directions, and
/// reads decode into the concrete type rather than loose JSON. Without an
/// explicit prefix the type's short name (plus `_`) scopes the keys.
pub struct ModelRepository<T: Model> {
    inner: Repository,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Model> ModelRepository<T> {
    pub fn new(store: Arc<dyn StoreBackend>, prefix: Option<String>) -> Self {
        let prefix = prefix.unwrap_or_else(|| format!("{}_", short_type_name::<T>()));
        Self {
            inner: Repository::new(store, prefix),
            _marker: PhantomData,
        }
    }

    /// Wrap an existing repository, keeping its prefix.
    pub fn from_repository(inner: Repository) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn prefix(&self) -> &str {
        self.inner.prefix()
    }

    pub async fn get(&self, key: impl fmt::Display) -> Result<Option<T>> {
        match self.inner.raw_get(key).await? {
            Some(raw) => Ok(Some(T::from_canonical_json(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save(
        &self,
        key: impl fmt::Display,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let encoded = value.canonical_json()?;
        self.inner.raw_save(key, &encoded, ttl).await
    }

    pub async fn save_with_intermediate<K: fmt::Display>(
        &self,
        keys: &[K],
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let encoded = value.canonical_json()?;
        self.inner.raw_save_with_intermediate(keys, &encoded, ttl).await
    }

    pub async fn get_with_intermediate(&self, key: impl fmt::Display) -> Result<Option<T>> {
        match self.inner.raw_get_with_intermediate(key).await? {
            Some(raw) => Ok(Some(T::from_canonical_json(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: impl fmt::Display) -> Result<()> {
        self.inner.delete(key).await
    }

    pub async fn delete_with_intermediate<K: fmt::Display>(&self, keys: &[K]) -> Result<()> {
        self.inner.delete_with_intermediate(keys).await
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

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[async_trait]
impl<T: Model + 'static> KeyedStore for ModelRepository<T> {
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
impl<T: Model + 'static> ValueStore<T> for ModelRepository<T> {
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
    use crate::store::MemoryBackend;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Portfolio {
        owner: String,
        positions: Vec<String>,
    }

    impl Model for Portfolio {}

    fn sample() -> Portfolio {
        Portfolio {
            owner: "alice".to_string(),
            positions: vec!["VT".to_string(), "BND".to_string()],
        }
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let repo: ModelRepository<Portfolio> =
            ModelRepository::new(Arc::new(MemoryBackend::new()), Some("pf:".to_string()));

        repo.save("alice", &sample(), None).await.unwrap();
        assert_eq!(repo.get("alice").await.unwrap(), Some(sample()));
        assert_eq!(repo.get("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_default_prefix_is_type_name() {
        let repo: ModelRepository<Portfolio> =
            ModelRepository::new(Arc::new(MemoryBackend::new()), None);
        assert_eq!(repo.prefix(), "Portfolio_");
    }

    #[tokio::test]
    async fn test_typed_two_hop() {
        let repo: ModelRepository<Portfolio> =
            ModelRepository::new(Arc::new(MemoryBackend::new()), Some("pf:".to_string()));
        let keys = ["by-id".to_string(), "by-owner".to_string()];

        repo.save_with_intermediate(&keys, &sample(), None)
            .await
            .unwrap();
        assert_eq!(
            repo.get_with_intermediate("by-id").await.unwrap(),
            Some(sample())
        );
        assert_eq!(
            repo.get_with_intermediate("by-owner").await.unwrap(),
            Some(sample())
        );

        repo.delete_with_intermediate(&keys).await.unwrap();
        assert_eq!(repo.get_with_intermediate("by-id").await.unwrap(), None);
    }
}
