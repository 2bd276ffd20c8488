//! Embedding backends.
//!
//! - `HashedTokenEmbedder`: offline feature hashing over word tokens
//! - `OllamaEmbedder`: HTTP client for an Ollama server's `/api/embed`
//!
//! Both return L2-normalized vectors so inner product equals cosine
//! similarity.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::EmbeddingService;
use crate::error::{FactCheckError, Result};

/// Default dimension for the hashed embedder
pub const DEFAULT_DIMENSION: usize = 384;

/// Default Ollama server address
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default Ollama embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// L2-normalize a vector in place. Returns false for zero or non-finite input.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    if v.iter().any(|x| !x.is_finite()) {
        return false;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Trim every input, rejecting blank ones
fn trimmed_inputs(texts: &[String]) -> Result<Vec<&str>> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(FactCheckError::EmbeddingFailure(format!(
                    "input {} is blank",
                    i
                )))
            } else {
                Ok(trimmed)
            }
        })
        .collect()
}

/// Deterministic bag-of-words embedder.
///
/// Each lower-cased alphanumeric token is hashed with SHA-256 into one of
/// `dimension` buckets. Texts sharing vocabulary land close together, and
/// identical texts always produce identical vectors.
#[derive(Debug, Clone)]
pub struct HashedTokenEmbedder {
    dimension: usize,
    model_id: String,
}

impl Default for HashedTokenEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            model_id: format!("hashed-token-{}", DEFAULT_DIMENSION),
        }
    }
}

impl HashedTokenEmbedder {
    /// Create an embedder producing vectors of `dimension` components
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(FactCheckError::EmbeddingFailure(
                "dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: format!("hashed-token-{}", dimension),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % self.dimension as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        // Punctuation-only text still gets a stable, non-zero vector
        if tokens.is_empty() {
            tokens.push(lowered.as_str());
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens {
            vector[self.bucket(token)] += 1.0;
        }
        // Counts are positive, so the norm is never zero
        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingService for HashedTokenEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs = trimmed_inputs(texts)?;
        Ok(inputs.into_iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Request body for `POST /api/embed`
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

/// Response body for `POST /api/embed`
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from an Ollama server
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Create a client for `base_url` (e.g. `http://localhost:11434`)
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| FactCheckError::EmbeddingFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs = trimmed_inputs(texts)?;
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = inputs.len(), model = %self.model, "Requesting embeddings");

        let response = self
            .client
            .post(self.endpoint())
            .json(&EmbedRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await
            .map_err(|e| FactCheckError::EmbeddingFailure(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FactCheckError::EmbeddingFailure(format!(
                "embedding server returned {}: {}",
                status,
                body.trim()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| FactCheckError::EmbeddingFailure(format!("invalid embedding response: {}", e)))?;

        let mut embeddings = body.embeddings;
        for (i, vector) in embeddings.iter_mut().enumerate() {
            if !l2_normalize(vector) {
                return Err(FactCheckError::EmbeddingFailure(format!(
                    "embedding {} is zero or not finite",
                    i
                )));
            }
        }

        Ok(embeddings)
    }
}
