//! Error types for the healing loop.

use thiserror::Error;

/// Result type alias for healing operations.
pub type HealResult<T> = Result<T, HealError>;

/// Errors that can escape the healing loop.
///
/// Oracle and sandbox failures never appear here: they are converted to
/// typed outcomes (failed sandbox results, per-issue terminal statuses, a
/// FAILED run) inside the loop, so control flow never depends on catching
/// faults mid-iteration.
#[derive(Error, Debug)]
pub enum HealError {
    #[error("No runtime profile detected for working tree")]
    NoRuntimeProfile,

    #[error(transparent)]
    Core(#[from] remedy_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
