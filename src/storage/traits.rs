//! Storage traits and error types
//!
//! This module defines the dedup store interface and its error type.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("URL already recorded as posted: {0}")]
    DuplicateKey(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned by a panicked task")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable set of previously published URLs
///
/// URLs are compared byte for byte. No normalization happens, so
/// `https://x/1` and `https://x/1/` are two different records.
///
/// Every method is its own atomic unit; nothing spans calls.
pub trait DedupStore {
    /// Returns true iff a record with exactly this URL exists
    fn has(&self, url: &str) -> StorageResult<bool>;

    /// Records a URL as posted
    ///
    /// Fails with [`StorageError::DuplicateKey`] if it is already recorded.
    fn add(&mut self, url: &str) -> StorageResult<()>;

    /// Deletes all but the `keep` most recently inserted records
    ///
    /// Returns the number of deleted records; zero when there were no more
    /// than `keep` to begin with.
    fn trim(&mut self, keep: usize) -> StorageResult<usize>;

    /// Deletes the record for a URL, returning whether one existed
    fn remove(&mut self, url: &str) -> StorageResult<bool>;

    /// Lists recorded URLs, oldest insertion first
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Counts recorded URLs
    fn count(&self) -> StorageResult<u64>;
}
