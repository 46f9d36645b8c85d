//! In-process TTL cache.
//!
//! Each [`MemoryCache`] owns its own map; two instances never see each other's
//! entries. Values are kept type-erased, so reading a key back as a different
//! type than it was written with is a miss rather than an error.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use naxios_core::{now_millis, CacheError, EpochMillis};
use tracing::{debug, trace};

use crate::entry::expires_at_from_now;
use crate::traits::{CacheStats, Cacheable, TtlCache};
use crate::{CacheConfig, CacheResult};

struct MemoryEntry {
    expires_at: EpochMillis,
    data: Arc<dyn Any + Send + Sync>,
}

impl MemoryEntry {
    fn is_valid_at(&self, now: EpochMillis) -> bool {
        now < self.expires_at
    }
}

/// In-memory cache backend.
///
/// # Example
///
/// ```ignore
/// use naxios_cache::{CacheConfig, MemoryCache, TtlCache};
///
/// let cache = MemoryCache::new(CacheConfig::default());
/// cache.set_item("naxios::mainnet:c.near:get", &42u64, None).await?;
/// let value: Option<u64> = cache.get_item("naxios::mainnet:c.near:get").await?;
/// ```
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    config: CacheConfig,
    stats: RwLock<CacheStats>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }

    fn record_expired(&self, count: u64) {
        if let Ok(mut stats) = self.stats.write() {
            stats.expired += count;
        }
    }

    /// Remove `key` if it is still expired at `now`.
    ///
    /// Re-checked under the write lock so a concurrent fresh write is kept.
    fn purge_if_expired(&self, key: &str, now: EpochMillis) -> CacheResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let expired = entries
            .get(key)
            .map(|entry| !entry.is_valid_at(now))
            .unwrap_or(false);
        if expired {
            entries.remove(key);
            drop(entries);
            self.record_expired(1);
            trace!(key = %key, "Purged expired entry on read");
        }
        Ok(())
    }
}

fn poisoned() -> CacheError {
    CacheError::Store {
        reason: "memory cache lock poisoned".to_string(),
    }
}

#[async_trait]
impl TtlCache for MemoryCache {
    async fn set_item<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        expiration: Option<Duration>,
    ) -> CacheResult<()> {
        let expiration = self.config.expiration_for(expiration);
        let entry = MemoryEntry {
            expires_at: expires_at_from_now(expiration),
            data: Arc::new(value.clone()),
        };

        self.entries
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), entry);

        if let Ok(mut stats) = self.stats.write() {
            stats.writes += 1;
        }
        Ok(())
    }

    async fn get_item<T: Cacheable>(&self, key: &str) -> CacheResult<Option<T>> {
        let now = now_millis();

        let lookup = {
            let entries = self.entries.read().map_err(|_| poisoned())?;
            entries.get(key).map(|entry| {
                if entry.is_valid_at(now) {
                    Some(entry.data.downcast_ref::<T>().cloned())
                } else {
                    None
                }
            })
        };

        match lookup {
            Some(Some(Some(value))) => {
                self.record_hit();
                Ok(Some(value))
            }
            Some(Some(None)) => {
                debug!(key = %key, "Cached value has a different type, treating as miss");
                self.record_miss();
                Ok(None)
            }
            Some(None) => {
                self.purge_if_expired(key, now)?;
                self.record_miss();
                Ok(None)
            }
            None => {
                self.record_miss();
                Ok(None)
            }
        }
    }

    async fn remove_item(&self, key: &str) -> CacheResult<()> {
        self.entries
            .write()
            .map_err(|_| poisoned())?
            .remove(key);
        Ok(())
    }

    async fn clean_up(&self) -> CacheResult<u64> {
        let now = now_millis();
        let purged = {
            let mut entries = self.entries.write().map_err(|_| poisoned())?;
            let before = entries.len();
            entries.retain(|_, entry| entry.is_valid_at(now));
            (before - entries.len()) as u64
        };

        if purged > 0 {
            self.record_expired(purged);
            debug!(purged, "Memory cache cleanup");
        }
        Ok(purged)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.entry_count = self.len() as u64;
        Ok(stats)
    }
}
