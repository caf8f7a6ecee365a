//! Request queue error types.

use thiserror::Error;

use super::RequestId;
use crate::ErrorKind;

/// Errors raised by the request queue itself.
///
/// Failures of a unit's body are reported unchanged; these variants only cover
/// what the queue adds on top: admission, withdrawal and transaction
/// resolution.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `kind()` and `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QueueError {
    /// A write was attempted through a read-only Operation.
    #[error("Request {id} is a read-only operation")]
    ReadOnly { id: RequestId },

    /// A request handle was used after its unit stopped being the active one.
    #[error("Request {id} is no longer active")]
    Inactive { id: RequestId },

    /// `withdraw` on a unit that is already active or completed.
    #[error("Request {id} is not pending")]
    NotPending { id: RequestId },

    /// The unit was withdrawn before it was admitted.
    #[error("Request {id} was withdrawn")]
    Withdrawn { id: RequestId },

    /// The unit's task ended without reporting a result.
    #[error("Request {id} was abandoned before completing")]
    Abandoned { id: RequestId },

    /// The engine refused to commit; the transaction was rolled back.
    #[error("Commit of request {id} failed")]
    CommitFailed {
        id: RequestId,
        #[source]
        source: Box<crate::Error>,
    },

    /// Rolling back the transaction failed too.
    ///
    /// `trigger` is the body or commit failure that caused the rollback.
    #[error("Rollback of request {id} failed (after: {trigger})")]
    RollbackFailed {
        id: RequestId,
        #[source]
        source: Box<crate::Error>,
        trigger: Box<crate::Error>,
    },
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::ReadOnly { .. }
            | QueueError::Inactive { .. }
            | QueueError::NotPending { .. } => ErrorKind::InvalidArgument,
            QueueError::Withdrawn { .. } | QueueError::Abandoned { .. } => ErrorKind::Other,
            QueueError::CommitFailed { .. } => ErrorKind::CommitFailed,
            QueueError::RollbackFailed { .. } => ErrorKind::RollbackFailed,
        }
    }

    /// Check if this error reports a failed commit or rollback.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            QueueError::CommitFailed { .. } | QueueError::RollbackFailed { .. }
        )
    }

    /// The request this error belongs to.
    pub fn request_id(&self) -> RequestId {
        match self {
            QueueError::ReadOnly { id }
            | QueueError::Inactive { id }
            | QueueError::NotPending { id }
            | QueueError::Withdrawn { id }
            | QueueError::Abandoned { id }
            | QueueError::CommitFailed { id, .. }
            | QueueError::RollbackFailed { id, .. } => *id,
        }
    }
}

impl From<QueueError> for crate::Error {
    fn from(err: QueueError) -> Self {
        crate::Error::Queue(err)
    }
}
