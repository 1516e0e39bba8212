//! Outcome codes reported to upload callbacks
//!
//! The tracker treats these as opaque; it only forwards them. The set mirrors
//! what a device SDK reports back to the application for a file upload.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How an upload concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    Ok,
    OkEmpty,
    BadFormat,
    Unauthorized,
    TooManyDevices,
    HubOrDeviceIdNotFound,
    PreconditionFailed,
    RequestEntityTooLarge,
    Throttled,
    InternalServerError,
    ServerBusy,
    Error,
    MessageExpired,
    /// The upload was still in flight when it was cancelled or the client closed
    #[serde(rename = "MESSAGE_CANCELLED_ONCLOSE")]
    MessageCancelledOnClose,
}

impl UploadStatus {
    /// Returns true if the upload produced its resource
    pub fn is_success(&self) -> bool {
        matches!(self, UploadStatus::Ok | UploadStatus::OkEmpty)
    }

    /// Returns true if the upload was cut short by a cancel or close
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadStatus::MessageCancelledOnClose)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStatus::Ok => "OK",
            UploadStatus::OkEmpty => "OK_EMPTY",
            UploadStatus::BadFormat => "BAD_FORMAT",
            UploadStatus::Unauthorized => "UNAUTHORIZED",
            UploadStatus::TooManyDevices => "TOO_MANY_DEVICES",
            UploadStatus::HubOrDeviceIdNotFound => "HUB_OR_DEVICE_ID_NOT_FOUND",
            UploadStatus::PreconditionFailed => "PRECONDITION_FAILED",
            UploadStatus::RequestEntityTooLarge => "REQUEST_ENTITY_TOO_LARGE",
            UploadStatus::Throttled => "THROTTLED",
            UploadStatus::InternalServerError => "INTERNAL_SERVER_ERROR",
            UploadStatus::ServerBusy => "SERVER_BUSY",
            UploadStatus::Error => "ERROR",
            UploadStatus::MessageExpired => "MESSAGE_EXPIRED",
            UploadStatus::MessageCancelledOnClose => "MESSAGE_CANCELLED_ONCLOSE",
        };
        write!(f, "{}", name)
    }
}

/// Final result of an upload future: the status plus the produced blob, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub status: UploadStatus,
    pub blob_uri: Option<Url>,
}

impl UploadOutcome {
    pub fn success(blob_uri: Url) -> Self {
        UploadOutcome {
            status: UploadStatus::Ok,
            blob_uri: Some(blob_uri),
        }
    }

    /// A failed upload never carries a blob location
    pub fn failure(status: UploadStatus) -> Self {
        UploadOutcome {
            status,
            blob_uri: None,
        }
    }
}
