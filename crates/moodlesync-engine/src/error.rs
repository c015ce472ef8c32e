//! Sync error types.

use std::io;

use moodlesync_core::CoreError;
use moodlesync_providers::ProviderError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// IO error (lock file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Site, calendar or credential failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Invalid domain value (status label, window size).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Another run holds the lock for this calendar.
    #[error("another sync for this calendar is already running (lock file: {path})")]
    AlreadyRunning { path: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an already running error.
    pub fn already_running(path: impl Into<String>) -> Self {
        Self::AlreadyRunning { path: path.into() }
    }
}
