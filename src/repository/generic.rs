//! Generic JSON repository

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::cache::config::CacheConfig;
use crate::cache::key::random_key;
use crate::error::{CacheError, Result};
use crate::serialize::{from_json, to_canonical_json};
use crate::store::{BatchOp, StoreBackend};

use super::{KeyedStore, ValueStore};

/// TTL applied when a save does not specify one.
pub const DEFAULT_REPOSITORY_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Prefix-scoped key-value accessor with canonical-JSON encoding.
///
/// Keys are anything `Display` (strings, UUIDs, argument hashes); the
/// stored key is always `prefix + key`. Every operation is one store round
/// trip; the `_with_intermediate` variants batch theirs into a single
/// atomic pipeline.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn StoreBackend>,
    prefix: String,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(store: Arc<dyn StoreBackend>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Build a repository from `config`: under its pinned `key_prefix`
    /// when given, otherwise under a fresh random prefix reserved in the
    /// store (collision-checked per `config.key_attempts`).
    pub async fn from_config(
        store: Arc<dyn StoreBackend>,
        config: &CacheConfig,
    ) -> Result<Self> {
        config.validate()?;
        let prefix = match &config.key_prefix {
            Some(fixed) => fixed.clone(),
            None => random_key(store.as_ref(), &config.base_prefix, config.key_attempts).await?,
        };
        Ok(Self::new(store, prefix))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The backend this repository talks to.
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.store
    }

    fn full_key(&self, key: impl fmt::Display) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
        Some(ttl.unwrap_or(DEFAULT_REPOSITORY_TTL))
    }

    // Raw string layer shared with the typed specializations.

    pub(crate) async fn raw_get(&self, key: impl fmt::Display) -> Result<Option<String>> {
        self.store.get(&self.full_key(key)).await
    }

    pub(crate) async fn raw_save(
        &self,
        key: impl fmt::Display,
        encoded: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.store
            .set(&self.full_key(key), encoded, Self::effective_ttl(ttl))
            .await
    }

    pub(crate) async fn raw_save_with_intermediate<K: fmt::Display>(
        &self,
        keys: &[K],
        encoded: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        if keys.is_empty() {
            return Err(CacheError::Config(
                "save_with_intermediate needs at least one key".to_string(),
            ));
        }

        let intermediate = Uuid::new_v4().to_string();
        let ttl = Self::effective_ttl(ttl);

        let mut ops: Vec<BatchOp> = keys
            .iter()
            .map(|key| BatchOp::Set {
                key: self.full_key(key),
                value: intermediate.clone(),
                ttl,
            })
            .collect();
        ops.push(BatchOp::Set {
            key: intermediate.clone(),
            value: encoded.to_string(),
            ttl,
        });

        self.store.run_batch(ops).await?;
        debug!("Saved value behind intermediate {} for {} keys", intermediate, keys.len());
        Ok(())
    }

    pub(crate) async fn raw_get_with_intermediate(
        &self,
        key: impl fmt::Display,
    ) -> Result<Option<String>> {
        let intermediate = match self.store.get(&self.full_key(key)).await? {
            Some(id) => id,
            None => return Ok(None),
        };
        self.store.get(&intermediate).await
    }

    // Public generic surface.

    /// Fetch and decode the value under `key`; `Ok(None)` on a miss. A
    /// stored falsy value (`0`, `""`, `false`) decodes as `Some`, distinct
    /// from absence.
    pub async fn get<T: DeserializeOwned>(&self, key: impl fmt::Display) -> Result<Option<T>> {
        match self.raw_get(key).await? {
            Some(raw) => Ok(Some(from_json(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and write `value` under `key`, overwriting unconditionally.
    /// `ttl: None` applies the two-week repository default.
    pub async fn save<T: Serialize>(
        &self,
        key: impl fmt::Display,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let encoded = to_canonical_json(value)?;
        self.raw_save(key, &encoded, ttl).await
    }

    /// Write `value` once under a fresh intermediate and point every `key`
    /// at it, all in one atomic batch.
    pub async fn save_with_intermediate<T: Serialize, K: fmt::Display>(
        &self,
        keys: &[K],
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let encoded = to_canonical_json(value)?;
        self.raw_save_with_intermediate(keys, &encoded, ttl).await
    }

    /// Resolve `key → intermediate → value`; absent when either hop misses.
    pub async fn get_with_intermediate<T: DeserializeOwned>(
        &self,
        key: impl fmt::Display,
    ) -> Result<Option<T>> {
        match self.raw_get_with_intermediate(key).await? {
            Some(raw) => Ok(Some(from_json(&raw)?)),
            None => Ok(None),
        }
    }

    /// Delete the entry under `key`.
    pub async fn delete(&self, key: impl fmt::Display) -> Result<()> {
        self.store.delete(&self.full_key(key)).await?;
        Ok(())
    }

    /// Delete every given key plus the intermediate they point at
    /// (resolved via the first key), as one atomic batch.
    pub async fn delete_with_intermediate<K: fmt::Display>(&self, keys: &[K]) -> Result<()> {
        let first = keys.first().ok_or_else(|| {
            CacheError::Config("delete_with_intermediate needs at least one key".to_string())
        })?;

        let intermediate = self.store.get(&self.full_key(first)).await?;

        let mut ops: Vec<BatchOp> = keys
            .iter()
            .map(|key| BatchOp::Delete {
                key: self.full_key(key),
            })
            .collect();
        if let Some(intermediate) = intermediate {
            ops.push(BatchOp::Delete { key: intermediate });
        }

        self.store.run_batch(ops).await
    }

    /// Whether `key` holds a live entry.
    pub async fn exists(&self, key: impl fmt::Display) -> Result<bool> {
        self.store.exists(&self.full_key(key)).await
    }

    /// Reset the expiry of the entry under `key`.
    pub async fn expire(&self, key: impl fmt::Display, ttl: Duration) -> Result<bool> {
        self.store.expire(&self.full_key(key), ttl).await
    }

    /// Live keys under this repository's prefix.
    pub async fn count(&self) -> Result<u64> {
        self.store.count_prefix(&self.prefix).await
    }

    /// Remove every key under this repository's prefix.
    pub async fn clear(&self) -> Result<u64> {
        self.store.delete_prefix(&self.prefix).await
    }
}

#[async_trait]
impl KeyedStore for Repository {
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
impl<T> ValueStore<T> for Repository
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self, local_key: &str) -> Result<Option<T>> {
        self.get(local_key).await
    }

    async fn store(&self, local_key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        self.save(local_key, value, ttl).await
    }
}
