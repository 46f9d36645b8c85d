//! TTL cache capability and cacheable value marker.
//!
//! Every backend in this crate implements [`TtlCache`], so callers can swap
//! persistence without touching call sites.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::CacheResult;

/// Marker trait for values that can be cached.
///
/// The persistent backend needs a portable text form, so values must be
/// `Serialize + DeserializeOwned` even when only the in-memory backend is used.
pub trait Cacheable: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Expiring key/value cache.
///
/// # Expiry
///
/// An entry written at `t` with expiration `e` is valid while `now < t + e`.
/// Reads of an invalid entry behave as a miss and may purge it; [`TtlCache::clean_up`]
/// sweeps every expired entry this cache owns.
///
/// # Concurrency
///
/// Writes to different keys are independent. Concurrent writes to the same key
/// are last-write-wins.
#[async_trait]
pub trait TtlCache: Send + Sync {
    /// Store `value` under `key`, replacing any existing entry.
    ///
    /// `expiration` overrides the backend default for this entry only.
    async fn set_item<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        expiration: Option<Duration>,
    ) -> CacheResult<()>;

    /// Get the value stored under `key` if present and unexpired.
    ///
    /// A missing key is `Ok(None)`, never an error.
    async fn get_item<T: Cacheable>(&self, key: &str) -> CacheResult<Option<T>>;

    /// Delete the entry under `key`. Absent keys are a no-op.
    async fn remove_item(&self, key: &str) -> CacheResult<()>;

    /// Delete every expired entry owned by this cache.
    ///
    /// Returns the number of entries purged.
    async fn clean_up(&self) -> CacheResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> CacheResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of reads that returned a value.
    pub hits: u64,
    /// Number of reads that returned nothing (absent, expired or unreadable).
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Number of expired or corrupt entries purged so far.
    pub expired: u64,
    /// Number of successful writes.
    pub writes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
