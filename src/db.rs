use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::engine::{LedgerStore, StoreError};

pub const DEFAULT_LEDGER_KEY: &str = "watch_history";

/// SQLite-backed [`LedgerStore`]: one row holds the whole serialized ledger.
pub struct Database {
    conn: Connection,
    key: String,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self {
            conn,
            key: DEFAULT_LEDGER_KEY.to_string(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            key: DEFAULT_LEDGER_KEY.to_string(),
        })
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_state (
                ledger_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn last_saved_at(&self) -> Result<Option<String>> {
        let saved_at = self
            .conn
            .query_row(
                "SELECT saved_at FROM ledger_state WHERE ledger_key = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(saved_at)
    }
}

impl LedgerStore for Database {
    fn load_ledger(&self) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row(
                "SELECT payload FROM ledger_state WHERE ledger_key = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    fn save_ledger(&mut self, payload: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                r#"
                INSERT INTO ledger_state (ledger_key, payload, saved_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(ledger_key) DO UPDATE SET
                    payload = excluded.payload,
                    saved_at = excluded.saved_at
                "#,
                params![self.key, payload, now],
            )
            .map(|_| ())
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}
