//! Cache statistics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hit/miss instrumentation for one wrapped callable.
///
/// `hits` and `misses` count only the local process and are approximate
/// under concurrency. `currsize` is read live from the store when the
/// snapshot is taken, so it stays correct even when other processes mutate
/// the same prefix. `maxsize` is always `None`: the store's TTL is the only
/// bound on this cache.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cache hits observed by this process
    pub hits: u64,

    /// Cache misses observed by this process
    pub misses: u64,

    /// Always `None` (unbounded)
    pub maxsize: Option<u64>,

    /// Live keys under the wrapper's prefix at snapshot time
    pub currsize: u64,
}

impl CacheStats {
    /// Hit rate as a percentage of all lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Miss rate as a percentage of all lookups.
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, maxsize: unbounded, currsize: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.currsize
        )
    }
}
