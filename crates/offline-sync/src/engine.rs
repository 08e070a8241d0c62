//! Sync engine: drains pending staged records against the backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use platewise_core::{ReplayTransport, RetryPolicy, StagedRecord};
use platewise_storage_kv::StagingStore;

/// How one drain invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainStatus {
    Completed,
    /// Another drain was already in flight; this one was dropped, not queued.
    Skipped,
    /// The pending list could not be read; nothing was attempted.
    StorageError,
}

/// Lightweight metrics for one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub status: DrainStatus,
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub deferred: usize,
}

impl DrainReport {
    fn empty(status: DrainStatus) -> Self {
        Self {
            status,
            attempted: 0,
            synced: 0,
            failed: 0,
            deferred: 0,
        }
    }
}

/// Replays every Pending staged record exactly once per drain cycle.
///
/// Sync is best-effort and invisible on failure: a record whose replay
/// fails stays Pending for the next Offline→Online edge or periodic
/// opportunity, and no user-facing error is raised.
pub struct SyncEngine {
    staging: Arc<StagingStore>,
    transport: Arc<dyn ReplayTransport>,
    retry: Arc<dyn RetryPolicy>,
    drain_in_flight: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        staging: Arc<StagingStore>,
        transport: Arc<dyn ReplayTransport>,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            staging,
            transport,
            retry,
            drain_in_flight: AtomicBool::new(false),
        }
    }

    /// One pass over every currently Pending record.
    ///
    /// Serialized by an in-flight flag: invoking while a pass is running
    /// is a no-op. Replays run strictly sequentially so a backend that
    /// just recovered is not flooded, and one record's failure never
    /// aborts the rest of the pass.
    pub async fn drain(&self) -> DrainReport {
        if self.drain_in_flight.swap(true, Ordering::SeqCst) {
            debug!("drain already in flight, dropping trigger");
            return DrainReport::empty(DrainStatus::Skipped);
        }

        let report = self.drain_pass().await;
        self.drain_in_flight.store(false, Ordering::SeqCst);
        info!(
            "drain finished: attempted={} synced={} failed={} deferred={}",
            report.attempted, report.synced, report.failed, report.deferred
        );
        report
    }

    async fn drain_pass(&self) -> DrainReport {
        // Records staged while this pass runs are picked up by the next
        // drain, not this one.
        let pending = match self.staging.list_pending(None) {
            Ok(records) => records,
            Err(e) => {
                warn!("could not read pending staged records: {}", e);
                return DrainReport::empty(DrainStatus::StorageError);
            }
        };

        let mut report = DrainReport::empty(DrainStatus::Completed);
        for record in pending {
            if self.deferred(&record) {
                report.deferred += 1;
                continue;
            }
            report.attempted += 1;

            let kind = record.kind();
            if let Err(e) = self.staging.mark_attempt(kind, &record.key) {
                warn!(
                    "could not stamp replay attempt for {:?}/'{}': {}",
                    kind, record.key, e
                );
            }

            match self.transport.replay_create(&record).await {
                // Never optimistic: Synced only after the backend acknowledged.
                Ok(()) => match self.staging.mark_synced(kind, &record.key) {
                    Ok(()) => {
                        report.synced += 1;
                        debug!("replayed {:?} record '{}'", kind, record.key);
                    }
                    Err(e) => {
                        report.failed += 1;
                        warn!(
                            "replay succeeded but {:?}/'{}' could not be marked synced: {}",
                            kind, record.key, e
                        );
                    }
                },
                Err(e) => {
                    report.failed += 1;
                    debug!("replay failed for {:?} record '{}': {}", kind, record.key, e);
                }
            }
        }
        report
    }

    /// A record attempted more recently than the injected policy allows
    /// waits for a later drain.
    fn deferred(&self, record: &StagedRecord) -> bool {
        let Some(backoff) = self.retry.backoff_after(record.attempt_count) else {
            return false;
        };
        let Some(last) = record.last_sync_attempt_at.as_deref() else {
            return false;
        };
        let Ok(last) = DateTime::parse_from_rfc3339(last) else {
            return false;
        };
        let backoff = chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::zero());
        Utc::now() < last.with_timezone(&Utc) + backoff
    }
}
