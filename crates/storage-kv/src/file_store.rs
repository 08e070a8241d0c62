//! JSON-file-backed implementation of the key-value primitive.
//!
//! Stands in for the browser profile's storage when the core runs outside
//! a webview (tests, the desktop shell, headless tooling). The whole store
//! is one JSON object; every mutation rewrites the file through a rename
//! so a crash mid-write leaves the previous image intact.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use platewise_core::{KvError, KvResult, KvStore};

pub struct JsonFileKvStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileKvStore {
    /// Open (or create) the store backing file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> KvResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| KvError::Io(format!("corrupt store file {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(KvError::Io(e.to_string())),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> KvResult<()> {
        let raw = serde_json::to_string(entries).map_err(|e| KvError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(|e| KvError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| KvError::Io(e.to_string()))?;
        Ok(())
    }
}

impl KvStore for JsonFileKvStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| KvError::Unavailable("file store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KvError::Unavailable("file store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KvError::Unavailable("file store lock poisoned".to_string()))?;
        entries.remove(key);
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("store.json");

        let store = JsonFileKvStore::open(&path).expect("open");
        store.set("a", "1").expect("set");
        store.set("b", "2").expect("set");
        store.remove("a").expect("remove");
        drop(store);

        let reopened = JsonFileKvStore::open(&path).expect("reopen");
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempdir().expect("tempdir");
        let store = JsonFileKvStore::open(dir.path().join("fresh.json")).expect("open");
        assert_eq!(store.get("anything").unwrap(), None);
    }
}
