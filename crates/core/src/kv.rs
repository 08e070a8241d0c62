//! Durable string-keyed storage contract.

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Result type alias for key-value operations.
pub type KvResult<T> = std::result::Result<T, KvError>;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("storage I/O failure: {0}")]
    Io(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous string-keyed get/set/remove primitive scoped to one browser
/// profile. The staging store, session store, and response cache are all
/// layered on top of it with JSON-serialized values under well-known keys.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    fn remove(&self, key: &str) -> KvResult<()>;
}

/// In-memory store for tests and ephemeral profiles.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| KvError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KvError::Unavailable("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KvError::Unavailable("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
