//! Typed errors for the metadata pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Schema or vocabulary could not be resolved (fatal for the request)
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Completion service failed permanently for a request-level call
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    /// Repository read or write failed at the node level
    #[error("repository error: {0}")]
    Repository(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the external completion service.
///
/// All four kinds are retryable up to the configured limit; after the
/// limit is exhausted they become a permanent per-field failure.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// Provider rate limit hit
    #[error("rate limited")]
    RateLimited,

    /// Request to the provider timed out
    #[error("completion timed out")]
    Timeout,

    /// Provider returned an error
    #[error("provider error: {0}")]
    Provider(String),

    /// Response could not be parsed into a value
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors from schema and vocabulary resolution.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Context, version, or schema file does not resolve to a known artifact
    #[error("schema not found: {context}/{version}/{file}")]
    NotFound {
        context: String,
        version: String,
        file: String,
    },

    /// Context is not registered with the source
    #[error("unknown context: {0}")]
    UnknownContext(String),

    /// Vocabulary reference does not resolve
    #[error("vocabulary not found: {0}")]
    VocabularyNotFound(String),

    /// Schema artifact declares the same field id more than once
    #[error("duplicate field id {field} in {file}")]
    DuplicateField { file: String, field: String },

    /// The source itself failed (I/O, decoding)
    #[error("schema source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for completion-service calls.
pub type CompletionResult<T> = std::result::Result<T, CompletionError>;

/// Result type alias for schema-source operations.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
