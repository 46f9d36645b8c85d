//! Runtime-selectable cache backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::lmdb_store::LmdbStore;
use crate::memory::MemoryCache;
use crate::storage::StorageCache;
use crate::store::KeyValueStore;
use crate::traits::{CacheStats, Cacheable, TtlCache};
use crate::{CacheConfig, CacheResult};

/// Either cache backend behind one [`TtlCache`] implementation.
pub enum CacheStore<S = LmdbStore> {
    Memory(MemoryCache),
    Storage(StorageCache<S>),
}

impl<S: KeyValueStore> CacheStore<S> {
    pub fn memory(config: CacheConfig) -> Self {
        CacheStore::Memory(MemoryCache::new(config))
    }

    pub fn storage(store: S, config: CacheConfig) -> Self {
        CacheStore::Storage(StorageCache::new(store, config))
    }

    /// Short backend name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheStore::Memory(_) => "memory",
            CacheStore::Storage(_) => "storage",
        }
    }
}

impl<S> From<MemoryCache> for CacheStore<S> {
    fn from(cache: MemoryCache) -> Self {
        CacheStore::Memory(cache)
    }
}

impl<S> From<StorageCache<S>> for CacheStore<S> {
    fn from(cache: StorageCache<S>) -> Self {
        CacheStore::Storage(cache)
    }
}

#[async_trait]
impl<S: KeyValueStore> TtlCache for CacheStore<S> {
    async fn set_item<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        expiration: Option<Duration>,
    ) -> CacheResult<()> {
        match self {
            CacheStore::Memory(cache) => cache.set_item(key, value, expiration).await,
            CacheStore::Storage(cache) => cache.set_item(key, value, expiration).await,
        }
    }

    async fn get_item<T: Cacheable>(&self, key: &str) -> CacheResult<Option<T>> {
        match self {
            CacheStore::Memory(cache) => cache.get_item(key).await,
            CacheStore::Storage(cache) => cache.get_item(key).await,
        }
    }

    async fn remove_item(&self, key: &str) -> CacheResult<()> {
        match self {
            CacheStore::Memory(cache) => cache.remove_item(key).await,
            CacheStore::Storage(cache) => cache.remove_item(key).await,
        }
    }

    async fn clean_up(&self) -> CacheResult<u64> {
        match self {
            CacheStore::Memory(cache) => cache.clean_up().await,
            CacheStore::Storage(cache) => cache.clean_up().await,
        }
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        match self {
            CacheStore::Memory(cache) => cache.stats().await,
            CacheStore::Storage(cache) => cache.stats().await,
        }
    }
}
