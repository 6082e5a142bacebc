//! Error types for the finance advisor core

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Invalid caller input (non-positive income, empty query, malformed
    /// transaction amount). Always surfaced to the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Knowledge store missing or erroring. Recovered locally by
    /// degrading to an empty-context answer.
    #[error("Retrieval unavailable: {0}")]
    Retrieval(String),

    /// All LLM providers failed. Recovered locally via the rule-based
    /// fallback response.
    #[error("Generation unavailable: {0}")]
    Generation(String),

    /// Missing or invalid startup configuration. Fatal before serving.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
