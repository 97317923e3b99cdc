//! # Cache-aside wrappers
//!
//! This module implements the wrapping layer over the repositories:
//! deterministic argument hashing, the read-side [`Cached`] wrapper and the
//! write-side [`Invalidating`] wrapper.
//!
//! ## Key protocol
//!
//! Both wrappers derive keys through [`arg_hash`] over normalized
//! [`ArgValue`]s, so a read wrapper and an invalidation wrapper configured
//! for the same argument subset compute the same key for the same logical
//! call, even when the mutator only receives an identifier while the read
//! received the identifier plus filters.
//!
//! ## Example
//!
//! ```no_run
//! use cachette::{Cached, MemoryBackend, Repository};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repo = Repository::new(Arc::new(MemoryBackend::new()), "quotes:");
//! let quote = Cached::new(repo, |(ticker,): (String,)| async move {
//!     Ok(format!("price for {ticker}"))
//! });
//!
//! let first = quote.call(("VT".to_string(),)).await?; // miss, computes
//! let second = quote.call(("VT".to_string(),)).await?; // hit
//! assert_eq!(first, second);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod invalidation;
pub mod key;
pub mod stats;
pub mod wrapper;

pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_CACHE_TTL};
pub use invalidation::{BoundArgs, Invalidating};
pub use key::{arg_hash, random_key, ArgValue, CallArgs, CallableKind, CallerIdentity, HashArgs};
pub use stats::CacheStats;
pub use wrapper::Cached;
