//! ============================================================================
//! Storage Module - Local persisted state
//! ============================================================================
//! Two small seams stand in for browser storage:
//! - `KeyValueStore`: string key-value pairs (the device identity lives here)
//! - `CacheStorage`: named caches of fetched responses for offline use
//!
//! `LocalStore` persists both in one redb file; `MemoryStore` keeps them in
//! process memory for tests and ephemeral hosts.
//! ============================================================================

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Persistent string key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Remove every key
    fn clear(&self) -> Result<(), StorageError>;
}

/// A response body stored for offline use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Unix timestamp when the entry was stored
    pub cached_at: i64,
}

/// Named response caches, keyed by request URL
pub trait CacheStorage: Send + Sync {
    fn cache_match(&self, cache: &str, url: &str) -> Result<Option<CachedResponse>, StorageError>;

    fn cache_put(&self, cache: &str, url: &str, response: &CachedResponse) -> Result<(), StorageError>;

    /// URLs stored in a cache, sorted
    fn cache_keys(&self, cache: &str) -> Result<Vec<String>, StorageError>;
}

/// Storage key for an entry in a named cache
fn cache_key(cache: &str, url: &str) -> String {
    format!("{}:{}", cache, url)
}
