//! Error taxonomy for the retrieval and verification pipeline.
//!
//! Structural failures (empty input, empty corpus, missing index) are
//! returned to the caller. Reasoning-service failures are produced by the
//! completion adapters but absorbed by the verifier into an `Unverifiable`
//! verdict.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, FactCheckError>;

/// Errors raised by the fact-checking pipeline
#[derive(Debug, Error)]
pub enum FactCheckError {
    #[error("Input text is required")]
    EmptyInput,

    #[error("Evidence count must be at least 1")]
    InvalidEvidenceCount,

    #[error("Cannot build index without facts")]
    EmptyCorpus,

    #[error("Facts file not found at {}", path.display())]
    CorpusNotFound { path: PathBuf },

    #[error("Invalid facts file {}: {reason}", path.display())]
    CorpusFormat { path: PathBuf, reason: String },

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Vector index not loaded. Build or load an index first")]
    NoActiveIndex,

    #[error("Query dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Index holds {vectors} vectors but {facts} facts")]
    IndexInconsistent { vectors: usize, facts: usize },

    #[error("Index file not found at {}", path.display())]
    SnapshotNotFound { path: PathBuf },

    #[error("Corrupt index snapshot at {}: {reason}. Rebuild the index", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("Reasoning service '{program}' not found: {reason}")]
    ExternalServiceUnavailable { program: String, reason: String },

    #[error("Reasoning service response timed out after {}s", timeout.as_secs())]
    ExternalServiceTimeout { timeout: Duration },

    #[error("Reasoning service error: {stderr}")]
    ExternalServiceFailed { exit_code: i32, stderr: String },

    #[error("Model response missing or malformed: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FactCheckError {
    /// Whether this error came from the reasoning service boundary
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ExternalServiceUnavailable { .. }
                | Self::ExternalServiceTimeout { .. }
                | Self::ExternalServiceFailed { .. }
                | Self::MalformedResponse(_)
        )
    }
}
