//! Adapter interfaces for external services.
//!
//! The pipeline talks to three collaborators it does not own:
//! - a reasoning model (`TextCompletionService`), by default `ollama run`
//! - an embedding model (`EmbeddingService`)
//! - a claim extractor (`ClaimExtractor`)

pub mod embedding;
pub mod extractor;
pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::Claim;
use crate::error::Result;

// Re-export the default implementations
pub use embedding::{HashedTokenEmbedder, OllamaEmbedder};
pub use extractor::SentenceClaimExtractor;
pub use ollama::OllamaCompletion;

/// A text-completion backend used for verification.
///
/// Implementations return the raw completion text. Failures are reported
/// as `ExternalServiceUnavailable`, `ExternalServiceTimeout`,
/// `ExternalServiceFailed` or `MalformedResponse`.
#[async_trait]
pub trait TextCompletionService: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Complete a prompt, giving up after `timeout`
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Maps text to unit-normalized vectors of a fixed dimension.
///
/// Inputs are non-empty strings; the output has one vector per input, in
/// the same order.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Identifier of the embedding model, recorded in index snapshots
    fn model_id(&self) -> &str;

    /// Embed a batch of texts
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Splits free text into candidate claims
#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    /// Extract claims in document order
    async fn extract(&self, text: &str) -> Result<Vec<Claim>>;
}
