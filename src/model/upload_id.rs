use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an upload tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UploadId(u64);

impl UploadId {
    pub(crate) fn new(id: u64) -> Self {
        UploadId(id)
    }
}

impl From<u64> for UploadId {
    fn from(id: u64) -> Self {
        UploadId(id)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Upload-{}", self.0)
    }
}
