//! # cachette
//!
//! A Redis-backed cache-aside layer: wrap an async computation and its
//! results are remembered in the store for a bounded time, keyed by a
//! deterministic hash of the call's arguments.
//!
//! ## Features
//!
//! - Order-independent, restart-stable argument hashing, with structured
//!   domain values normalized through their canonical JSON
//! - Prefix-scoped repositories with generic, model-typed and
//!   response-payload encodings
//! - Two-hop "key → intermediate → value" storage so several keys can
//!   alias one value and be invalidated together
//! - Read-side wrapper with hit/miss counters, forced bypass and
//!   whole-prefix clear; write-side wrapper that invalidates the matching
//!   entry after a mutation
//! - In-memory backend with real TTL semantics for tests and single-node
//!   use
//!
//! ## Caching a function
//!
//! ```no_run
//! use cachette::{Cached, RedisBackend, Repository, StoreConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = Arc::new(RedisBackend::connect(StoreConfig::from_env()).await?);
//!     let repo = Repository::new(backend, "reports:");
//!
//!     let report = Cached::new(repo, |(year, quarter): (i64, i64)| async move {
//!         Ok(format!("report {year}-Q{quarter}"))
//!     });
//!
//!     let value = report.call((2024, 1)).await?; // miss: computes and stores
//!     let again = report.call((2024, 1)).await?; // hit: served from Redis
//!     assert_eq!(value, again);
//!
//!     let stats = report.stats().await?;
//!     println!("hits: {}, misses: {}", stats.hits, stats.misses);
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidating after a write
//!
//! ```no_run
//! use cachette::{ArgValue, BoundArgs, Invalidating, MemoryBackend, Repository, Result};
//! use std::sync::Arc;
//!
//! struct RenameArgs {
//!     user_id: i64,
//!     new_name: String,
//! }
//!
//! impl BoundArgs for RenameArgs {
//!     fn bound_args(&self) -> Result<Vec<(&'static str, ArgValue)>> {
//!         Ok(vec![
//!             ("user_id", self.user_id.into()),
//!             ("new_name", self.new_name.clone().into()),
//!         ])
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repo = Repository::new(Arc::new(MemoryBackend::new()), "users:");
//!
//! // Deletes the entry a read keyed by (user_id) once the rename lands.
//! let rename = Invalidating::new(repo, |args: RenameArgs| async move {
//!     let _ = args.new_name;
//!     Ok(())
//! })
//! .with_key_args(["user_id"]);
//!
//! rename
//!     .call(RenameArgs {
//!         user_id: 7,
//!         new_name: "new".to_string(),
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod repository;
pub mod serialize;
pub mod store;

// Re-export main types for convenience
pub use cache::{
    arg_hash, random_key, ArgValue, BoundArgs, CacheConfig, CacheConfigBuilder, CacheStats,
    CallArgs, CallableKind, CallerIdentity, Cached, HashArgs, Invalidating, DEFAULT_CACHE_TTL,
};
pub use connection::{RedisBackend, StoreConfig, DEFAULT_REDIS_URL};
pub use error::{CacheError, Result};
pub use repository::{
    CacheableResponse, KeyedStore, ModelRepository, Repository, ResponseRepository, ValueStore,
    DEFAULT_REPOSITORY_TTL,
};
pub use serialize::{from_json, to_canonical_json, Model};
pub use store::{BatchOp, MemoryBackend, StoreBackend};
