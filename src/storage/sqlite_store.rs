//! SQLite-backed durable store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use super::store::{DurableStore, StoreError, StoreResult};

/// Key-value table holding serialized values, one row per key.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    table: String,
    key: String,
}

impl SqliteStore {
    /// Table name for stored values.
    pub const DEFAULT_TABLE: &'static str = "kv_store";

    /// Open (or create) a database file and ensure the table exists.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, key: impl Into<String>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?, key)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub fn open_in_memory(key: impl Into<String>) -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, key)
    }

    fn with_connection(conn: Connection, key: impl Into<String>) -> StoreResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );"
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table,
            key: key.into(),
        })
    }
}

impl DurableStore for SqliteStore {
    fn load(&self) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let value = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", self.table),
                rusqlite::params![self.key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, serialized: &str) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        conn.execute(
            &format!(
                "INSERT INTO {} (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                self.table
            ),
            rusqlite::params![self.key, serialized, now_ms],
        )?;
        Ok(())
    }
}
