//! Error types for batch analysis operations

use thiserror::Error;

/// Batch analysis specific errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// Invalid batch configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV (de)serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream data provider returned an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Symbol identity could not be resolved
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// AI / LLM failure
    #[error("AI analysis error: {0}")]
    Ai(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    Indicator(String),

    /// Report rendering error
    #[error("Report error: {0}")]
    Report(String),

    /// Email delivery error
    #[error("Email error: {0}")]
    Email(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;

impl From<batch_llm::LLMError> for BatchError {
    fn from(err: batch_llm::LLMError) -> Self {
        BatchError::Ai(err.to_string())
    }
}

impl From<minijinja::Error> for BatchError {
    fn from(err: minijinja::Error) -> Self {
        BatchError::Report(err.to_string())
    }
}
