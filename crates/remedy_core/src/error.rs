//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Git operation failed: {0}")]
    GitError(String),

    #[error("Run record not found: {0}")]
    RunNotFound(String),

    #[error("No ledger entry for key: {0}")]
    IssueNotFound(String),

    #[error("Invalid issue path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
