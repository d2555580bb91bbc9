use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;

use crate::storage::{KeyValueStore, StorageError};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
}

/// SQLite-backed key-value storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;

        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Open a database that lives only as long as this value
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS storage (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    #[cfg(test)]
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get the value stored under `key`
    pub fn get_value(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the value stored under `key`
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_value(key)?)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        tracing::trace!(key, bytes = value.len(), "writing storage entry");
        Ok(self.set_value(key, value)?)
    }
}
