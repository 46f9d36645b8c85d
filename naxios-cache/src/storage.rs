//! Persistent TTL cache over a [`KeyValueStore`].
//!
//! Entries are stored as JSON text `{"expiresAt": <epoch-ms>, "data": <value>}`
//! under namespaced keys (`naxios::...`), so the cache can share a store with
//! unrelated data. Cleanup only ever scans keys under the namespace.
//!
//! # Degraded Mode
//!
//! The store is probed once at construction. If it is unusable, the cache runs
//! without it: writes and removals are no-ops, reads return `None`, cleanup
//! purges nothing. No error is raised for an unavailable store.

use std::borrow::Cow;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use naxios_core::{is_namespaced, now_millis, CacheError, CACHE_KEY_PREFIX};
use serde_json::Value;
use tracing::{debug, warn};

use crate::entry::{CacheEntry, EntryHeader};
use crate::lmdb_store::LmdbStore;
use crate::store::KeyValueStore;
use crate::traits::{CacheStats, Cacheable, TtlCache};
use crate::{CacheConfig, CacheResult};

/// Persistent cache backend.
pub struct StorageCache<S = LmdbStore> {
    store: Option<S>,
    config: CacheConfig,
    stats: RwLock<CacheStats>,
}

impl<S: KeyValueStore> StorageCache<S> {
    /// Wrap `store`, probing it once.
    pub fn new(store: S, config: CacheConfig) -> Self {
        let store = match store.probe() {
            Ok(()) => Some(store),
            Err(e) => {
                warn!(error = %e, "Persistent store inaccessible, cache disabled");
                None
            }
        };
        Self {
            store,
            config,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// A cache with no usable store: every operation is a no-op.
    pub fn unavailable(config: CacheConfig) -> Self {
        Self {
            store: None,
            config,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Whether the store passed its construction-time probe.
    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
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

    fn namespaced_keys(store: &S) -> CacheResult<Vec<String>> {
        Ok(store
            .keys()?
            .into_iter()
            .filter(|key| is_namespaced(key))
            .collect())
    }
}

impl StorageCache<LmdbStore> {
    /// Open an LMDB-backed cache at `path`.
    ///
    /// A failure to open the environment degrades to [`StorageCache::unavailable`].
    pub fn open<P: AsRef<std::path::Path>>(path: P, max_size_mb: usize, config: CacheConfig) -> Self {
        match LmdbStore::open(path, max_size_mb) {
            Ok(store) => Self::new(store, config),
            Err(e) => {
                warn!(error = %e, "Failed to open LMDB cache store, cache disabled");
                Self::unavailable(config)
            }
        }
    }
}

/// Key under which `key` is persisted. Already-namespaced keys are kept as is.
pub fn storage_key(key: &str) -> Cow<'_, str> {
    if is_namespaced(key) {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(format!("{CACHE_KEY_PREFIX}{key}"))
    }
}

#[async_trait]
impl<S: KeyValueStore> TtlCache for StorageCache<S> {
    async fn set_item<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        expiration: Option<Duration>,
    ) -> CacheResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let entry = CacheEntry::new(value, self.config.expiration_for(expiration));
        let text = serde_json::to_string(&entry).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        store.set(&storage_key(key), &text)?;

        if let Ok(mut stats) = self.stats.write() {
            stats.writes += 1;
        }
        Ok(())
    }

    async fn get_item<T: Cacheable>(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let key = storage_key(key);
        let Some(text) = store.get(&key)? else {
            self.record_miss();
            return Ok(None);
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                // Corrupt or foreign payload: drop it so it stops shadowing the key.
                debug!(key = %key, error = %e, "Unreadable cache entry, purging");
                store.remove(&key)?;
                self.record_expired(1);
                self.record_miss();
                return Ok(None);
            }
        };

        if !entry.is_valid_at(now_millis()) {
            store.remove(&key)?;
            self.record_expired(1);
            self.record_miss();
            return Ok(None);
        }

        // A well-formed entry of another type is a miss, not corruption.
        match serde_json::from_value::<T>(entry.data) {
            Ok(data) => {
                self.record_hit();
                Ok(Some(data))
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Cached value has a different type");
                self.record_miss();
                Ok(None)
            }
        }
    }

    async fn remove_item(&self, key: &str) -> CacheResult<()> {
        if let Some(store) = &self.store {
            store.remove(&storage_key(key))?;
        }
        Ok(())
    }

    async fn clean_up(&self) -> CacheResult<u64> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let now = now_millis();
        let mut purged = 0u64;

        for key in Self::namespaced_keys(store)? {
            let Some(text) = store.get(&key)? else {
                continue;
            };
            let expired = match serde_json::from_str::<EntryHeader>(&text) {
                Ok(header) => now >= header.expires_at,
                // Unreadable entries can only ever miss.
                Err(_) => true,
            };
            if expired && store.remove(&key)? {
                purged += 1;
            }
        }

        if purged > 0 {
            self.record_expired(purged);
            debug!(purged, "Storage cache cleanup");
        }
        Ok(purged)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        if let Some(store) = &self.store {
            stats.entry_count = Self::namespaced_keys(store)?.len() as u64;
        }
        Ok(stats)
    }
}
