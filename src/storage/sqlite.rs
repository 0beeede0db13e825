//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DedupStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DedupStore, StorageError, StorageResult};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if needed) the dedup database at `path`
    ///
    /// Missing parent directories are created. Opening a database left by an
    /// earlier run keeps its records.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened dedup store at {}", path.display());

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl DedupStore for SqliteStorage {
    fn has(&self, url: &str) -> StorageResult<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT url FROM posted_urls WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        tracing::trace!("{} already posted: {}", url, found.is_some());
        Ok(found.is_some())
    }

    fn add(&mut self, url: &str) -> StorageResult<()> {
        match self
            .conn
            .execute("INSERT INTO posted_urls (url) VALUES (?1)", params![url])
        {
            Ok(_) => {
                tracing::debug!("Stored {} in posted_urls", url);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::DuplicateKey(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn trim(&mut self, keep: usize) -> StorageResult<usize> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let removed = self.conn.execute(
            "DELETE FROM posted_urls WHERE ROWID IN
             (SELECT ROWID FROM posted_urls ORDER BY ROWID DESC LIMIT -1 OFFSET ?1)",
            params![keep],
        )?;

        tracing::debug!("Trimmed {} old entries from posted_urls", removed);
        Ok(removed)
    }

    fn remove(&mut self, url: &str) -> StorageResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM posted_urls WHERE url = ?1", params![url])?;
        Ok(removed > 0)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM posted_urls ORDER BY ROWID ASC")?;

        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posted_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(urls: &[&str]) -> SqliteStorage {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for url in urls {
            storage.add(url).unwrap();
        }
        storage
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_has_after_add() {
        let storage = store_with(&["https://x/1"]);

        assert!(storage.has("https://x/1").unwrap());
        assert!(!storage.has("https://x/2").unwrap());
    }

    #[test]
    fn test_urls_are_not_normalized() {
        let storage = store_with(&["https://x/1"]);

        assert!(!storage.has("https://x/1/").unwrap());
        assert!(!storage.has("HTTPS://x/1").unwrap());
        assert!(!storage.has("https://x/1?").unwrap());
    }

    #[test]
    fn test_duplicate_add_fails_with_duplicate_key() {
        let mut storage = store_with(&["https://x/1"]);

        let result = storage.add("https://x/1");

        match result {
            Err(StorageError::DuplicateKey(url)) => assert_eq!(url, "https://x/1"),
            other => panic!("expected DuplicateKey, got {:?}", other),
        }
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_trim_keeps_most_recent() {
        let urls: Vec<String> = (0..150).map(|i| format!("https://x/{}", i)).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let mut storage = store_with(&refs);

        let removed = storage.trim(100).unwrap();

        assert_eq!(removed, 50);
        assert_eq!(storage.count().unwrap(), 100);
        assert!(!storage.has("https://x/49").unwrap());
        assert!(storage.has("https://x/50").unwrap());
        assert!(storage.has("https://x/149").unwrap());
    }

    #[test]
    fn test_trim_uses_insertion_order_not_url_order() {
        let mut storage = store_with(&["https://x/9", "https://x/1", "https://x/5"]);

        storage.trim(2).unwrap();

        assert_eq!(storage.list().unwrap(), vec!["https://x/1", "https://x/5"]);
    }

    #[test]
    fn test_trim_below_cap_is_noop() {
        let mut storage = store_with(&["https://x/1", "https://x/2"]);

        assert_eq!(storage.trim(100).unwrap(), 0);
        assert_eq!(storage.count().unwrap(), 2);

        let mut empty = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(empty.trim(100).unwrap(), 0);
    }

    #[test]
    fn test_insertion_order_survives_trim_and_reinsert() {
        let mut storage = store_with(&["https://x/1", "https://x/2", "https://x/3"]);
        storage.trim(2).unwrap();
        storage.add("https://x/4").unwrap();
        storage.trim(2).unwrap();

        assert_eq!(storage.list().unwrap(), vec!["https://x/3", "https://x/4"]);
    }

    #[test]
    fn test_remove() {
        let mut storage = store_with(&["https://x/1"]);

        assert!(storage.remove("https://x/1").unwrap());
        assert!(!storage.remove("https://x/1").unwrap());
        assert!(!storage.has("https://x/1").unwrap());

        // A removed URL can be recorded again
        storage.add("https://x/1").unwrap();
        assert!(storage.has("https://x/1").unwrap());
    }

    #[test]
    fn test_reopen_existing_database_keeps_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("posts.sqlite3");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.add("https://x/1").unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert!(storage.has("https://x/1").unwrap());
        assert_eq!(storage.count().unwrap(), 1);
    }
}
