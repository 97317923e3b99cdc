//! Cache-aside wrapper for read computations
//!
//! [`Cached`] composes an inner async callable with a repository handle, a
//! key policy and a TTL. Instead of patching the callable, every cache
//! operation is a named method on the wrapper: [`Cached::call`],
//! [`Cached::bypass`], [`Cached::stats`], [`Cached::clear`],
//! [`Cached::invalidate`].
//!
//! There is no single-flight protection: two concurrent callers racing on
//! one key may both miss, both compute and both write; the last writer
//! wins.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::cache::config::{CacheConfig, DEFAULT_CACHE_TTL};
use crate::cache::key::{arg_hash, CallArgs, CallableKind, HashArgs};
use crate::cache::stats::CacheStats;
use crate::error::Result;
use crate::repository::{KeyedStore, ValueStore};

/// A callable wrapped with cache-aside behavior.
///
/// `S` is the repository specialization (generic, model or response) and is
/// chosen by the caller at construction; `F` is the inner callable. The
/// repository handle is injected; the wrapper never reaches for a shared
/// connection.
pub struct Cached<S, F> {
    repo: S,
    inner: F,
    kind: CallableKind,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S, F> Cached<S, F> {
    /// Wrap `inner` over `repo` with the default 60-second TTL.
    pub fn new(repo: S, inner: F) -> Self {
        Self {
            repo,
            inner,
            kind: CallableKind::Function,
            ttl: Some(DEFAULT_CACHE_TTL),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Wrap `inner` taking the TTL from `config`.
    pub fn from_config(repo: S, inner: F, config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(repo, inner).with_ttl(config.default_ttl))
    }

    /// Set the key policy (bound method / response handler).
    pub fn with_kind(mut self, kind: CallableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the TTL written on every miss; `None` falls through to the
    /// repository default.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    /// The key an argument set resolves to, before prefixing.
    fn local_key(&self, args: &CallArgs) -> String {
        arg_hash(&self.kind.keyed_args(args)).to_string()
    }

    /// Look up the arguments' key; on a miss invoke the inner callable and
    /// remember its result under the configured TTL.
    pub async fn call<A, T, Fut>(&self, args: A) -> Result<T>
    where
        A: HashArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T>>,
        S: ValueStore<T>,
    {
        let key = self.local_key(&args.call_args()?);

        if let Some(value) = self.repo.load(&key).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit: {}", key);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss: {}", key);

        let value = (self.inner)(args).await?;
        self.repo.store(&key, &value, self.ttl).await?;
        Ok(value)
    }

    /// Invoke the inner callable unconditionally and overwrite the stored
    /// entry under the same key [`Cached::call`] would use. Counters are
    /// untouched.
    pub async fn bypass<A, T, Fut>(&self, args: A) -> Result<T>
    where
        A: HashArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T>>,
        S: ValueStore<T>,
    {
        let key = self.local_key(&args.call_args()?);
        debug!("Cache bypass: {}", key);

        let value = (self.inner)(args).await?;
        self.repo.store(&key, &value, self.ttl).await?;
        Ok(value)
    }

    /// Snapshot the counters; `currsize` is read live from the store.
    pub async fn stats(&self) -> Result<CacheStats>
    where
        S: KeyedStore,
    {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            maxsize: None,
            currsize: self.repo.live_count().await?,
        })
    }

    /// Drop every entry under the wrapper's prefix in one sweep and reset
    /// the counters.
    pub async fn clear(&self) -> Result<()>
    where
        S: KeyedStore,
    {
        self.repo.clear_all().await?;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Delete the single entry keyed by the given positional values. Named
    /// arguments are ignored; the key policy is not applied.
    pub async fn invalidate(&self, args: &CallArgs) -> Result<()>
    where
        S: KeyedStore,
    {
        let key = arg_hash(&args.positional_only()).to_string();
        debug!("Invalidated cache entry: {}", key);
        self.repo.remove(&key).await
    }
}
