//! Configuration for the upload driver

pub mod upload_settings;
