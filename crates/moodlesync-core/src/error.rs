//! Error types for the core data model.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while deriving values from scraped data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A submission status label outside the known classification buckets.
    #[error("unexpected submission status: {0}")]
    SubmissionStatus(String),

    /// A sync window must cover at least one month.
    #[error("sync window must cover at least one month, got {0}")]
    EmptyWindow(u32),
}

impl CoreError {
    /// Creates a submission status error.
    pub fn submission_status(status: impl Into<String>) -> Self {
        Self::SubmissionStatus(status.into())
    }
}
