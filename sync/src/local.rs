use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use redb::{Database, TableDefinition};

use crate::SyncError;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("local");

/// Raw keyed storage for the client-local cache.
///
/// Implementations must be safe for concurrent use.
pub trait LocalStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), SyncError>;

    /// Delete a key.
    fn delete(&self, key: &str) -> Result<(), SyncError>;
}

/// In-memory [`LocalStore`]. Data is lost on restart.
pub struct MemoryLocalStore {
    inner: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.remove(key);
        Ok(())
    }
}

/// Persistent [`LocalStore`] backed by redb.
pub struct RedbLocalStore {
    db: Database,
}

impl RedbLocalStore {
    /// Open or create a local store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SyncError> {
        let db = Database::create(path).map_err(storage)?;

        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(TABLE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }
}

impl LocalStore for RedbLocalStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;
        match table.get(key).map_err(storage)? {
            Some(value) => Ok(Some(value.value().to_vec())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SyncError> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            table.insert(key, value).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SyncError> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            table.remove(key).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }
}

fn storage<E: std::fmt::Display>(e: E) -> SyncError {
    SyncError::Storage(e.to_string())
}
