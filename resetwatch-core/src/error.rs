//! Error type shared by the reset pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the reset pipeline.
#[derive(Error, Debug)]
pub enum ResetError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode or decode failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A reset file decoded but its contents are unusable.
    #[error("Invalid reset record: {0}")]
    InvalidRecord(String),

    /// Reset links were requested but no URL base is configured.
    #[error(
        "password reset links are disabled as no URL base is configured; set `password_resets.url_base`"
    )]
    MissingUrlBase,

    /// The watch directory does not exist.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The filesystem subscription failed.
    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// The directory answered a lookup with a non-success status.
    #[error("failed to get user \"{user}\" (status {status})")]
    UserLookup {
        /// Id or name that was looked up.
        user: String,
        /// Status the directory returned.
        status: u16,
    },

    /// The directory could not be reached.
    #[error("Directory error: {0}")]
    Directory(String),

    /// The delivery channel rejected a message.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// The OS random source failed.
    #[error("PIN generation failed")]
    TokenGeneration,

    /// Unexpected failure inside the pipeline.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ResetError>;
