//! This module provides the value types shared by the tracker, the registry and the binary

pub mod tracker_error;
pub mod upload_id;
pub mod upload_status;
pub mod upload_task;
