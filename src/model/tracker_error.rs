//! Structured error types for upload tracking operations

use crate::model::upload_id::UploadId;
use thiserror::Error;

/// Errors raised by the upload tracker and the registry built on top of it
///
/// Every variant is a precondition violation reported synchronously to the
/// caller. Nothing here is retried or logged by the tracker itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// A required argument (callback, task, blob name) was missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Cancellation was queried before any task was attached
    #[error("Not ready: {0}")]
    NotReady(String),
    /// The registry has no in-flight upload with this id
    #[error("Unknown upload: {0}")]
    UnknownUpload(UploadId),
}

impl TrackerError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        TrackerError::InvalidArgument(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        TrackerError::NotReady(msg.into())
    }

    /// Returns true for errors caused by calling operations out of order
    pub fn is_sequencing_error(&self) -> bool {
        matches!(self, TrackerError::NotReady(_))
    }
}

/// Result type for tracker and registry operations
pub type TrackerResult<T = ()> = Result<T, TrackerError>;
