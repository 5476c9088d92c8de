//! Error types for the oracle crate.

use thiserror::Error;

/// Result type alias for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors that can occur when consulting an oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("LLM not configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Api(String),

    #[error("Oracle returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
