//! Text key/value store capability used by the persistent cache.

use std::collections::BTreeMap;
use std::sync::RwLock;

use naxios_core::CacheError;

use crate::CacheResult;

/// A namespaced text get/set/remove/enumerate capability.
///
/// Implementations only need to be a plain string map; expiry and namespacing
/// are handled by [`crate::StorageCache`].
pub trait KeyValueStore: Send + Sync {
    /// Check that the store is usable. Called once when a cache is constructed.
    fn probe(&self) -> CacheResult<()>;

    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove `key`; returns whether it was present.
    fn remove(&self, key: &str) -> CacheResult<bool>;

    /// Every key currently in the store, including keys this library does not own.
    fn keys(&self) -> CacheResult<Vec<String>>;
}

/// Process-local [`KeyValueStore`], useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    items: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CacheError {
    CacheError::Store {
        reason: "in-memory store lock poisoned".to_string(),
    }
}

impl KeyValueStore for InMemoryStore {
    fn probe(&self) -> CacheResult<()> {
        self.items.read().map(|_| ()).map_err(|_| poisoned())
    }

    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(items.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        let mut items = self.items.write().map_err(|_| poisoned())?;
        Ok(items.remove(key).is_some())
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        let items = self.items.read().map_err(|_| poisoned())?;
        Ok(items.keys().cloned().collect())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn probe(&self) -> CacheResult<()> {
        (**self).probe()
    }

    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        (**self).remove(key)
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        (**self).keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store_basic_ops() {
        let store = InMemoryStore::new();
        store.probe().expect("probe should succeed");
        store.set("a", "1").expect("set should succeed");
        assert_eq!(store.get("a").expect("get should succeed").as_deref(), Some("1"));
        assert!(store.remove("a").expect("remove should succeed"));
        assert!(!store.remove("a").expect("remove should succeed"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys_are_listed() {
        let store = InMemoryStore::new();
        store.set("b", "2").expect("set should succeed");
        store.set("a", "1").expect("set should succeed");
        assert_eq!(
            store.keys().expect("keys should succeed"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
