//! Last-successful-response cache for offline read fallback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use platewise_core::KvStore;

use crate::errors::Result;

const CACHE_KEY: &str = "platewise.response_cache";

/// One captured response body. Not a general cache: there is no
/// invalidation beyond the fixed TTL applied by [`ResponseCache::get_fresh`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub body: serde_json::Value,
    pub captured_at: String,
}

/// Maps a request fingerprint (`"METHOD /path"`) to the last successful
/// response body, used only as an offline read substitute.
pub struct ResponseCache {
    kv: Arc<dyn KvStore>,
}

impl ResponseCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn fingerprint(method: &str, path: &str) -> String {
        format!("{} {}", method.to_uppercase(), path)
    }

    fn load(&self) -> Result<HashMap<String, CacheEntry>> {
        match self.kv.get(CACHE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(HashMap::new()),
        }
    }

    pub fn put(&self, fingerprint: &str, body: &serde_json::Value) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                body: body.clone(),
                captured_at: Utc::now().to_rfc3339(),
            },
        );
        self.kv.set(CACHE_KEY, &serde_json::to_string(&entries)?)?;
        Ok(())
    }

    pub fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        Ok(self.load()?.remove(fingerprint))
    }

    /// TTL-checking variant used by the secondary client: entries older
    /// than `ttl` (or with an unreadable capture time) read as absent.
    pub fn get_fresh(&self, fingerprint: &str, ttl: Duration) -> Result<Option<CacheEntry>> {
        let Some(entry) = self.get(fingerprint)? else {
            return Ok(None);
        };
        let Ok(captured) = DateTime::parse_from_rfc3339(&entry.captured_at) else {
            return Ok(None);
        };
        let age = Utc::now().signed_duration_since(captured.with_timezone(&Utc));
        if age.num_milliseconds() <= ttl.as_millis() as i64 {
            Ok(Some(entry))
        } else {
            Ok(None)
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.kv.remove(CACHE_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platewise_core::MemoryKvStore;
    use serde_json::json;

    fn cache() -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryKvStore::new()))
    }

    #[test]
    fn last_write_wins_per_fingerprint() {
        let cache = cache();
        let fp = ResponseCache::fingerprint("get", "/meals");
        assert_eq!(fp, "GET /meals");

        cache.put(&fp, &json!({"success": true, "data": [1]})).unwrap();
        cache.put(&fp, &json!({"success": true, "data": [1, 2]})).unwrap();

        let entry = cache.get(&fp).unwrap().expect("entry");
        assert_eq!(entry.body["data"], json!([1, 2]));
    }

    #[test]
    fn fresh_lookup_rejects_stale_entries() {
        let cache = cache();
        let fp = ResponseCache::fingerprint("GET", "/meals");
        cache.put(&fp, &json!({"success": true})).unwrap();

        assert!(cache
            .get_fresh(&fp, Duration::from_secs(300))
            .unwrap()
            .is_some());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache
            .get_fresh(&fp, Duration::from_millis(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = cache();
        let fp = ResponseCache::fingerprint("GET", "/meals");
        cache.put(&fp, &json!({"success": true})).unwrap();
        cache.clear().unwrap();
        assert!(cache.get(&fp).unwrap().is_none());
    }
}
