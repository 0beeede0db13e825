//! Storage module for the dedup store
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Recording and looking up published URLs
//! - Bounded retention of the posted-URL log
//! - A cloneable handle that serializes access across feed tasks

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{DedupStore, StorageError, StorageResult};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Dedup store shared by every feed task
///
/// Each call holds the lock for the duration of that single call only, which
/// serializes writes without ever spanning a transaction across calls. The
/// lock is never held across an await point.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<SqliteStorage>>,
}

impl SharedStorage {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }

    pub fn has(&self, url: &str) -> StorageResult<bool> {
        self.lock()?.has(url)
    }

    pub fn add(&self, url: &str) -> StorageResult<()> {
        self.lock()?.add(url)
    }

    /// Best-effort retention trim; failures are logged, never returned
    pub fn trim(&self, keep: usize) {
        let result = self.lock().and_then(|mut storage| storage.trim(keep));
        match result {
            Ok(removed) if removed > 0 => {
                tracing::debug!("Cleaned up {} older posts from the dedup store", removed)
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to clean up older posts from the dedup store: {}", e),
        }
    }

    pub fn remove(&self, url: &str) -> StorageResult<bool> {
        self.lock()?.remove(url)
    }

    pub fn list(&self) -> StorageResult<Vec<String>> {
        self.lock()?.list()
    }

    pub fn count(&self) -> StorageResult<u64> {
        self.lock()?.count()
    }
}
