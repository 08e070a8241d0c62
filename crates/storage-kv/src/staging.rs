//! Local staging store: durable, key-addressed storage of offline-created
//! records, scoped per profile.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;

use platewise_core::{EntityKind, EntityPayload, KvStore, StagedRecord, SyncState};

use crate::errors::Result;

const STAGING_KEY_PREFIX: &str = "platewise.staging.";

/// Exclusive owner of [`StagedRecord`] persistence. Each entity kind lives
/// under its own well-known key as a JSON object keyed by natural key, so
/// re-staging a key overwrites rather than duplicates. Iteration order is
/// whatever the map yields; callers must not depend on it.
pub struct StagingStore {
    kv: Arc<dyn KvStore>,
}

impl StagingStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn storage_key(kind: EntityKind) -> String {
        format!("{}{}", STAGING_KEY_PREFIX, kind.storage_suffix())
    }

    fn load_kind(&self, kind: EntityKind) -> Result<HashMap<String, StagedRecord>> {
        match self.kv.get(&Self::storage_key(kind))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(HashMap::new()),
        }
    }

    fn persist_kind(&self, kind: EntityKind, records: &HashMap<String, StagedRecord>) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.kv.set(&Self::storage_key(kind), &raw)?;
        Ok(())
    }

    /// Insert or overwrite the record for the payload's `(kind, key)`,
    /// resetting it to Pending. Persisted immediately, so a reload never
    /// loses a staged write.
    pub fn put(&self, key: &str, payload: EntityPayload) -> Result<StagedRecord> {
        let kind = payload.kind();
        let mut records = self.load_kind(kind)?;
        let record = StagedRecord::new(key, payload);
        records.insert(key.to_string(), record.clone());
        self.persist_kind(kind, &records)?;
        debug!("staged {:?} record under key '{}'", kind, key);
        Ok(record)
    }

    pub fn get(&self, kind: EntityKind, key: &str) -> Result<Option<StagedRecord>> {
        Ok(self.load_kind(kind)?.remove(key))
    }

    /// All Pending records, optionally filtered by kind.
    pub fn list_pending(&self, kind: Option<EntityKind>) -> Result<Vec<StagedRecord>> {
        let kinds: Vec<EntityKind> = match kind {
            Some(k) => vec![k],
            None => EntityKind::ALL.to_vec(),
        };
        let mut pending = Vec::new();
        for k in kinds {
            pending.extend(
                self.load_kind(k)?
                    .into_values()
                    .filter(StagedRecord::is_pending),
            );
        }
        Ok(pending)
    }

    /// Every staged record of `kind`, regardless of state. Read-side
    /// source for offline list substitution.
    pub fn list_all(&self, kind: EntityKind) -> Result<Vec<StagedRecord>> {
        Ok(self.load_kind(kind)?.into_values().collect())
    }

    /// Mark the record Synced and stamp the attempt time. Idempotent;
    /// unknown keys are a no-op.
    pub fn mark_synced(&self, kind: EntityKind, key: &str) -> Result<()> {
        let mut records = self.load_kind(kind)?;
        if let Some(record) = records.get_mut(key) {
            record.sync_state = SyncState::Synced;
            record.last_sync_attempt_at = Some(Utc::now().to_rfc3339());
            self.persist_kind(kind, &records)?;
        }
        Ok(())
    }

    /// Stamp a replay attempt on a record that stays Pending.
    pub fn mark_attempt(&self, kind: EntityKind, key: &str) -> Result<()> {
        let mut records = self.load_kind(kind)?;
        if let Some(record) = records.get_mut(key) {
            record.attempt_count += 1;
            record.last_sync_attempt_at = Some(Utc::now().to_rfc3339());
            self.persist_kind(kind, &records)?;
        }
        Ok(())
    }

    /// Hard delete. Default policy retains Synced entries as an audit
    /// trail; pruning is the caller's decision.
    pub fn remove(&self, kind: EntityKind, key: &str) -> Result<()> {
        let mut records = self.load_kind(kind)?;
        if records.remove(key).is_some() {
            self.persist_kind(kind, &records)?;
        }
        Ok(())
    }
}
