use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{cache_key, CacheStorage, CachedResponse, KeyValueStore};
use crate::error::StorageError;

/// In-memory storage; contents are lost when dropped
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    caches: RwLock<BTreeMap<String, CachedResponse>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        Ok(values.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.values.write().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}

impl CacheStorage for MemoryStore {
    fn cache_match(&self, cache: &str, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        let caches = self.caches.read().unwrap_or_else(|e| e.into_inner());
        Ok(caches.get(&cache_key(cache, url)).cloned())
    }

    fn cache_put(&self, cache: &str, url: &str, response: &CachedResponse) -> Result<(), StorageError> {
        let mut caches = self.caches.write().unwrap_or_else(|e| e.into_inner());
        caches.insert(cache_key(cache, url), response.clone());
        Ok(())
    }

    fn cache_keys(&self, cache: &str) -> Result<Vec<String>, StorageError> {
        let prefix = cache_key(cache, "");
        let caches = self.caches.read().unwrap_or_else(|e| e.into_inner());
        Ok(caches
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}
