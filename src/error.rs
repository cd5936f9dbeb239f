//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record store error: {0}")]
    RecordStore(String),

    /// The store answered with success but its response body was unusable.
    #[error("Record store succeeded but its response could not be read: {0}")]
    UnreadableResponse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload of '{filename}' failed: {reason}")]
    Upload { filename: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
