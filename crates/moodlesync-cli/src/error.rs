//! Client error types.

use moodlesync_core::TracingError;
use moodlesync_engine::SyncError;
use moodlesync_providers::ProviderError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Sync run failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Provider error outside of a sync run.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Logging could not be set up.
    #[error("tracing error: {0}")]
    Tracing(#[from] TracingError),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display() {
        let err = ClientError::config("config file not found: /nope.yaml");
        assert_eq!(
            err.to_string(),
            "configuration error: config file not found: /nope.yaml"
        );
    }

    #[test]
    fn sync_errors_are_transparent() {
        let err: ClientError = SyncError::config("calendar_name must not be empty").into();
        assert_eq!(
            err.to_string(),
            "Configuration error: calendar_name must not be empty"
        );
    }
}
