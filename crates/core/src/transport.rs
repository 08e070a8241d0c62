//! Transport seam the sync engine drives during a drain.

use async_trait::async_trait;
use thiserror::Error;

use crate::staging::StagedRecord;

#[derive(Debug, Error)]
pub enum ReplayError {
    /// Network could not be established; the record stays staged.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered and rejected the create.
    #[error("replay rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Credentials missing or no longer accepted.
    #[error("authentication required: {0}")]
    Auth(String),

    /// The record could not be turned into a request body.
    #[error("replay payload could not be serialized: {0}")]
    Payload(String),
}

/// Issues the kind-appropriate create call for one staged record.
///
/// Implemented by the API gateway client; engine tests substitute mocks.
#[async_trait]
pub trait ReplayTransport: Send + Sync {
    async fn replay_create(&self, record: &StagedRecord) -> Result<(), ReplayError>;
}
