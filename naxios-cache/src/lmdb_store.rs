//! LMDB-backed key/value store.
//!
//! Uses the heed crate (Rust bindings for LMDB) as the persistent text store
//! behind [`crate::StorageCache`]. The environment may be shared with unrelated
//! data; the cache only ever touches keys under its own namespace.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get`, `keys` and `probe`
//! - Write transactions for `set` and `remove`

use std::path::Path;

use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};
use naxios_core::CacheError;

use crate::store::KeyValueStore;
use crate::CacheResult;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for CacheError {
    fn from(e: LmdbStoreError) -> Self {
        CacheError::Store {
            reason: e.to_string(),
        }
    }
}

fn txn_error(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

/// LMDB text store.
///
/// # Example
///
/// ```ignore
/// use naxios_cache::{CacheConfig, LmdbStore, StorageCache};
///
/// let store = LmdbStore::open("/var/lib/app/naxios-cache", 64)?;
/// let cache = StorageCache::new(store, CacheConfig::default());
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Str, Str>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Str, Str> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Self { env, db })
    }
}

impl KeyValueStore for LmdbStore {
    fn probe(&self) -> CacheResult<()> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        self.db.len(&rtxn).map_err(txn_error)?;
        Ok(())
    }

    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let value = self.db.get(&rtxn, key).map_err(txn_error)?;
        Ok(value.map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db.put(&mut wtxn, key, value).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let deleted = self.db.delete(&mut wtxn, key).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let iter = self.db.iter(&rtxn).map_err(txn_error)?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(txn_error)?;
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::open(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    #[test]
    fn test_open_and_probe() {
        let (store, _temp_dir) = create_test_store();
        store.probe().expect("probe should succeed");
    }

    #[test]
    fn test_set_get_remove() {
        let (store, _temp_dir) = create_test_store();
        store.set("naxios::k", "v").expect("set should succeed");
        assert_eq!(
            store.get("naxios::k").expect("get should succeed").as_deref(),
            Some("v")
        );
        assert!(store.remove("naxios::k").expect("remove should succeed"));
        assert!(store.get("naxios::k").expect("get should succeed").is_none());
        assert!(!store.remove("naxios::k").expect("remove should succeed"));
    }

    #[test]
    fn test_keys_lists_everything() {
        let (store, _temp_dir) = create_test_store();
        store.set("naxios::a", "1").expect("set should succeed");
        store.set("unrelated", "2").expect("set should succeed");
        let mut keys = store.keys().expect("keys should succeed");
        keys.sort();
        assert_eq!(keys, vec!["naxios::a".to_string(), "unrelated".to_string()]);
    }

    #[test]
    fn test_keys_reports_undecodable_entries() {
        let (store, _temp_dir) = create_test_store();
        store.set("naxios::a", "1").expect("set should succeed");

        let raw = store.db.remap_types::<heed::types::Bytes, heed::types::Bytes>();
        let mut wtxn = store.env.write_txn().expect("write txn should open");
        raw.put(&mut wtxn, &[0xff, 0xfe], b"2")
            .expect("raw put should succeed");
        wtxn.commit().expect("commit should succeed");

        let err = store.keys().expect_err("non UTF-8 key must not be skipped");
        assert!(matches!(err, CacheError::Store { .. }));
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let store =
                LmdbStore::open(temp_dir.path(), 10).expect("store creation should succeed");
            store.set("naxios::persisted", "yes").expect("set should succeed");
        }
        let store = LmdbStore::open(temp_dir.path(), 10).expect("store reopen should succeed");
        assert_eq!(
            store.get("naxios::persisted").expect("get should succeed").as_deref(),
            Some("yes")
        );
    }

    #[test]
    fn test_store_error_converts_to_cache_error() {
        let err: CacheError = LmdbStoreError::EnvOpen("denied".to_string()).into();
        assert!(matches!(err, CacheError::Store { ref reason } if reason.contains("denied")));
    }
}
