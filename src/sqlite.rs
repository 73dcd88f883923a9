// SQLite-backed key-value storage

use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::kv::KeyValueStore;

const DB_FILE: &str = "taskkeep.db";

/// Key-value storage in a single SQLite table
pub struct SqliteKv {
    db: Connection,
}

impl SqliteKv {
    /// Open or create `taskkeep.db` inside the given directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::storage(dir.display().to_string(), e))?;

        let db_path = dir.join(DB_FILE);
        let db = Connection::open(&db_path).map_err(|e| StoreError::storage(db_path.display().to_string(), e))?;
        Self::with_connection(db)
    }

    /// In-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().map_err(|e| StoreError::storage(":memory:", e))?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        let kv = Self { db };
        kv.create_schema()?;
        Ok(kv)
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating kv schema");

        self.db
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
            )
            .map_err(|e| StoreError::storage("kv", e))?;

        Ok(())
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::storage(key, e))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        debug!(key, bytes = value.len(), "SqliteKv::set");
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .map_err(|e| StoreError::storage(key, e))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .map_err(|e| StoreError::storage(key, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_database() {
        let temp = TempDir::new().unwrap();
        let _kv = SqliteKv::open(temp.path().join("store")).unwrap();
        assert!(temp.path().join("store").join(DB_FILE).exists());
    }

    #[test]
    fn test_set_get_replace_remove() {
        let mut kv = SqliteKv::open_in_memory().unwrap();

        assert_eq!(kv.get("categories").unwrap(), None);

        kv.set("categories", "[1]").unwrap();
        kv.set("categories", "[2]").unwrap();
        assert_eq!(kv.get("categories").unwrap().as_deref(), Some("[2]"));

        let rows: i64 = kv.db().query_row("SELECT COUNT(*) FROM kv", [], |r| r.get(0)).unwrap();
        assert_eq!(rows, 1);

        kv.remove("categories").unwrap();
        kv.remove("categories").unwrap();
        assert_eq!(kv.get("categories").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut kv = SqliteKv::open(temp.path()).unwrap();
            kv.set("theme", "\"dark\"").unwrap();
        }
        let kv = SqliteKv::open(temp.path()).unwrap();
        assert_eq!(kv.get("theme").unwrap().as_deref(), Some("\"dark\""));
    }
}
