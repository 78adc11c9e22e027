//! Error types shared across the engine.

use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in
/// engram-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider error: {message}")]
    Provider { message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("embedding count mismatch: requested {requested}, received {received}")]
    CountMismatch { requested: usize, received: usize },

    #[error("embedding dimension mismatch: expected {expected}, received {received}")]
    DimensionMismatch { expected: usize, received: usize },
}

impl EmbeddingError {
    /// Whether a retry with backoff could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Provider { .. })
    }
}

/// Errors surfaced by one extraction run.
///
/// Every variant propagates with zero side effects: either the write
/// transaction was never opened, or it rolled back. Invalid merge-decision
/// references are recovered locally and never reach this type.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The extraction or merge-decision model call failed or kept returning
    /// schema-invalid output after retries.
    #[error("upstream model call failed: {0}")]
    UpstreamModel(#[from] LlmError),

    /// An embedding call failed after retries.
    #[error("embedding call failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// A read or the final commit failed; on commit failure the whole
    /// transaction rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}
