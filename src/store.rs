//! Store boundary
//!
//! [`StoreBackend`] is the contract this layer requires from the remote
//! key-value store: plain get/set/delete/exists/expire, bulk prefix
//! operations, and an atomic multi-operation batch. [`MemoryBackend`]
//! implements it in-process with real TTL semantics; it backs the test
//! suite and single-node deployments, while `RedisBackend` (in
//! [`crate::connection`]) talks to a real server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

/// One operation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Write `value` under `key`, optionally with an expiry.
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// Remove `key`.
    Delete { key: String },
}

/// Contract required from the remote key-value store.
///
/// Every method is a blocking round trip from the caller's point of view;
/// nothing is retried here. `ttl: None` means the entry never expires.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Fetch the raw value under `key`; `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, overwriting unconditionally.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Remove `key`; returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Whether `key` currently holds a live entry.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Reset the expiry of an existing entry; returns false when the key
    /// is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Apply all operations as one atomic unit: either every operation
    /// takes effect or none does.
    async fn run_batch(&self, ops: Vec<BatchOp>) -> Result<()>;

    /// Count live keys starting with `prefix`.
    async fn count_prefix(&self, prefix: &str) -> Result<u64>;

    /// Remove every key starting with `prefix` in one sweep; returns the
    /// number of keys removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    /// Health probe.
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(deadline),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() > at,
            None => false,
        }
    }
}

fn deadline(ttl: Duration) -> DateTime<Utc> {
    Utc::now()
        + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365_000))
}

/// In-process [`StoreBackend`] with per-key TTL.
///
/// Expired entries are dropped lazily on access, the way a remote store
/// would report them absent.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(stored) if stored.is_expired() => {
                debug!("Entry expired: {}", key);
                entries.remove(key);
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), StoredValue::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(stored) if stored.is_expired() => {
                entries.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(stored) if !stored.is_expired() => {
                stored.expires_at = Some(deadline(ttl));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn run_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        // One write-lock section makes the whole batch atomic for readers.
        let mut entries = self.entries.write().await;
        for op in ops {
            match op {
                BatchOp::Set { key, value, ttl } => {
                    entries.insert(key, StoredValue::new(&value, ttl));
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn count_prefix(&self, prefix: &str) -> Result<u64> {
        let entries = self.entries.read().await;
        let count = entries
            .iter()
            .filter(|(key, stored)| key.starts_with(prefix) && !stored.is_expired())
            .count();
        Ok(count as u64)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let doomed: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &doomed {
            entries.remove(key);
        }
        debug!("Cleared {} keys under prefix {}", doomed.len(), prefix);
        Ok(doomed.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
