//! # Upload Tracker Library
//!
//! Tracks in-flight file uploads for a device client: each upload pairs the
//! application's completion callback and context with the task performing
//! the transfer, exposes the task's cancellation state, and reports the
//! outcome to the callback exactly once.
//!
//! The library is used by the upload-tracker binary, which drives uploads
//! into a local blob store.

#![forbid(unsafe_code)]

pub mod model;
pub mod services;
pub mod settings;
pub mod utils;
