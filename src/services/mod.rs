//! This module provides the upload tracker and the transport-side pieces that drive it

pub mod local_blob_store;
pub mod upload_in_progress;
pub mod upload_registry;
