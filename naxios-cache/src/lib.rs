//! Naxios Cache - TTL Cache Backends
//!
//! Expiring key/value caches behind one [`TtlCache`] capability:
//!
//! - [`MemoryCache`]: an explicit in-process map owned by its instance
//! - [`StorageCache`]: JSON entries in a [`KeyValueStore`] (LMDB by default),
//!   namespaced so the store can hold unrelated data
//!
//! Expiry is checked lazily on read and swept explicitly by
//! [`TtlCache::clean_up`].

pub mod backend;
pub mod config;
pub mod entry;
pub mod lmdb_store;
pub mod memory;
pub mod storage;
pub mod store;
pub mod traits;

pub use backend::CacheStore;
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use lmdb_store::{LmdbStore, LmdbStoreError};
pub use memory::MemoryCache;
pub use storage::{storage_key, StorageCache};
pub use store::{InMemoryStore, KeyValueStore};
pub use traits::{CacheStats, Cacheable, TtlCache};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, naxios_core::CacheError>;
