// ============================================================================
// LocalStore — Embedded Database (redb)
// ============================================================================
// Persistent local storage for key-value state and offline caches.
// Default path: ~/.appctl/local.redb (override via APPCTL_DB_PATH env var)
// ============================================================================

use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{cache_key, CacheStorage, CachedResponse, KeyValueStore};
use crate::error::StorageError;

// Table definitions
const LOCAL: TableDefinition<&str, &str> = TableDefinition::new("local_storage");
const CACHES: TableDefinition<&str, &[u8]> = TableDefinition::new("cache_storage");

/// redb-backed local storage
pub struct LocalStore {
    db: Database,
    path: PathBuf,
}

impl LocalStore {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses APPCTL_DB_PATH env var or ~/.appctl/local.redb
    pub fn open(path: Option<&Path>) -> Result<Self, StorageError> {
        let db_path = if let Some(p) = path {
            p.to_path_buf()
        } else if let Ok(env_path) = std::env::var("APPCTL_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir().ok_or(StorageError::NoHomeDir)?;
            let appctl_dir = home.join(".appctl");
            std::fs::create_dir_all(&appctl_dir)?;
            appctl_dir.join("local.redb")
        };

        info!("Opening local storage at: {}", db_path.display());

        let db = Database::create(&db_path)?;

        // Ensure tables exist so read transactions never miss them
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LOCAL)?;
            let _ = write_txn.open_table(CACHES)?;
        }
        write_txn.commit()?;

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL)?;
        let value = table.get(key)?.map(|v| v.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LOCAL)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;

        debug!("Stored local key: {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(LOCAL)?;
            let removed = table.remove(key)?;
            removed.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(LOCAL)?;
        {
            let _ = write_txn.open_table(LOCAL)?;
        }
        write_txn.commit()?;

        info!("Cleared local storage");
        Ok(())
    }
}

impl CacheStorage for LocalStore {
    fn cache_match(&self, cache: &str, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        let key = cache_key(cache, url);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CACHES)?;

        match table.get(key.as_str())? {
            Some(value) => {
                let response: CachedResponse = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(response))
            }
            None => Ok(None),
        }
    }

    fn cache_put(&self, cache: &str, url: &str, response: &CachedResponse) -> Result<(), StorageError> {
        let key = cache_key(cache, url);
        let value = bincode::serialize(response)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CACHES)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;

        debug!("Cached {} in {}", url, cache);
        Ok(())
    }

    fn cache_keys(&self, cache: &str) -> Result<Vec<String>, StorageError> {
        let prefix = cache_key(cache, "");

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CACHES)?;

        let mut urls = Vec::new();
        for entry in table.range::<&str>(..)? {
            let (key, _value) = entry?;
            if let Some(url) = key.value().strip_prefix(&prefix) {
                urls.push(url.to_string());
            }
        }
        Ok(urls)
    }
}
