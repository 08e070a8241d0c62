//! Staged-record model for offline-originated writes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{EntityKind, EntityPayload};

/// Replay lifecycle of a staged record.
///
/// `Failed` exists for policies that want a terminal state; the default
/// policy leaves failed records `Pending` so they are retried on every
/// reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Synced,
    Failed,
}

/// One offline-originated entity awaiting durable persistence on the
/// backend. Identity is the `(kind, key)` pair; `record_id` only labels
/// log lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedRecord {
    pub record_id: String,
    pub key: String,
    pub payload: EntityPayload,
    pub sync_state: SyncState,
    pub created_at: String,
    pub last_sync_attempt_at: Option<String>,
    #[serde(default)]
    pub attempt_count: i32,
}

impl StagedRecord {
    pub fn new(key: impl Into<String>, payload: EntityPayload) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            key: key.into(),
            payload,
            sync_state: SyncState::Pending,
            created_at: Utc::now().to_rfc3339(),
            last_sync_attempt_at: None,
            attempt_count: 0,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }

    pub fn is_pending(&self) -> bool {
        self.sync_state == SyncState::Pending
    }
}
