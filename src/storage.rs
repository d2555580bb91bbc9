use std::collections::HashMap;
use thiserror::Error;

use crate::database::DatabaseError;

/// Key under which the active collection is persisted.
pub const ACTIVE_KEY: &str = "tasks";
/// Key under which the completed collection is persisted.
pub const COMPLETED_KEY: &str = "completedTasks";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// String key-value store the task store persists into.
pub trait KeyValueStore {
    /// Read the value stored under `key`, or `None` if it was never written.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, as if an earlier session had written it.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
