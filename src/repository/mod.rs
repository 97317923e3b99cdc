//! Typed key-value repositories over the store
//!
//! A repository scopes every operation to its key `prefix` and owns the
//! encoding of values:
//!
//! - [`Repository`]: generic canonical-JSON encoding, any serde type per
//!   call
//! - [`ModelRepository`]: bound to one structured domain type, decoding
//!   through its [`crate::serialize::Model`] canonical form
//! - [`ResponseRepository`]: encodes through the value's own
//!   [`CacheableResponse`] payload form
//!
//! All three support the two-hop layout `key[i] → intermediate → value`,
//! which lets several keys alias one stored value and die together.

pub mod generic;
pub mod model;
pub mod response;

pub use generic::{Repository, DEFAULT_REPOSITORY_TTL};
pub use model::ModelRepository;
pub use response::{CacheableResponse, ResponseRepository};

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Prefix-scoped key operations a cache wrapper needs regardless of the
/// value type: single-entry removal, live key count, whole-prefix clear.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Delete the entry under `local_key` (prefix applied by the store).
    async fn remove(&self, local_key: &str) -> Result<()>;

    /// Live keys under this store's prefix, read from the remote store.
    async fn live_count(&self) -> Result<u64>;

    /// Delete every key under this store's prefix in one sweep.
    async fn clear_all(&self) -> Result<u64>;
}

/// Load/store of one value type; the seam between a cache wrapper and a
/// repository specialization. The caller picks the implementation
/// (generic, model-typed or response) at construction time.
#[async_trait]
pub trait ValueStore<T>: KeyedStore {
    /// Fetch and decode the value under `local_key`; `None` when absent.
    async fn load(&self, local_key: &str) -> Result<Option<T>>;

    /// Encode and write `value` under `local_key`. `ttl: None` falls back
    /// to the repository default of [`DEFAULT_REPOSITORY_TTL`].
    async fn store(&self, local_key: &str, value: &T, ttl: Option<Duration>) -> Result<()>;
}
