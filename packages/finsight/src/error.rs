//! Typed errors for the extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Empty or malformed page sequence
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Chunk exceeds the oracle's input-size limit
    #[error("chunk {chunk_index} too large: {size} chars (limit {limit})")]
    ChunkTooLarge {
        chunk_index: usize,
        size: usize,
        limit: usize,
    },

    /// Oracle call exhausted retries for a chunk (non-fatal to the document)
    #[error("extraction failed for chunk {chunk_index} after {attempts} attempts")]
    ExtractionFailed { chunk_index: usize, attempts: u32 },

    /// Query against a document with no canonical record
    #[error("no record for fingerprint: {fingerprint}")]
    RecordNotFound { fingerprint: String },

    /// Question does not resolve to a schema metric
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Cache I/O kept failing after backoff retries
    #[error("cache temporarily unavailable: {0}")]
    CacheUnavailable(String),

    /// Model oracle failed
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from the model oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Oracle API returned a non-success status
    #[error("oracle API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Oracle call exceeded its deadline
    #[error("oracle call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Oracle returned no content
    #[error("oracle returned an empty response")]
    EmptyResponse,

    /// Response text did not validate against the metric schema
    #[error("malformed oracle response: {reason}")]
    MalformedResponse { reason: String },
}

impl OracleError {
    /// Whether a retry with the same chunk is worthwhile.
    ///
    /// Malformed responses are retryable: the oracle is nondeterministic
    /// enough that a repeat attempt often parses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_)
            | Self::Timeout { .. }
            | Self::EmptyResponse
            | Self::MalformedResponse { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
