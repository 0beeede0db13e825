//! Database schema definitions
//!
//! This module contains the SQL schema for the dedup store.

/// SQL schema for the database
///
/// Insertion order is carried by the implicit ROWID of `posted_urls`.
pub const SCHEMA_SQL: &str = r#"
-- One row per URL that was published
CREATE TABLE IF NOT EXISTS posted_urls (
    url TEXT PRIMARY KEY
);
"#;

/// Initializes the database schema
///
/// Safe to run against a database created by an earlier run.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
