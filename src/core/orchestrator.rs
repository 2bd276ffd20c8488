//! Pipeline orchestrator.
//!
//! Coordinates corpus loading, index preparation, claim extraction,
//! retrieval and verification for one input text.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::adapters::{
    ClaimExtractor, EmbeddingService, HashedTokenEmbedder, OllamaCompletion, OllamaEmbedder,
    SentenceClaimExtractor, TextCompletionService,
};
use crate::config::{EmbeddingBackend, ResolvedConfig};
use crate::domain::{ClaimReport, Fact, Report, ScoredFact};
use crate::error::{FactCheckError, Result};

use super::corpus::load_facts;
use super::index::EvidenceIndex;
use super::snapshot::SnapshotPaths;
use super::verifier::VerificationEngine;

/// Default number of evidence facts per claim
pub const DEFAULT_K: usize = 3;

/// Runs the fact-checking pipeline
pub struct Orchestrator {
    corpus_path: PathBuf,
    extractor: Arc<dyn ClaimExtractor>,
    embedder: Arc<dyn EmbeddingService>,
    verifier: VerificationEngine,
    /// Held across build and search so concurrent runs see one corpus
    index: Mutex<EvidenceIndex>,
    reuse_snapshot: bool,
}

impl Orchestrator {
    /// Create an orchestrator over the corpus at `corpus_path`
    pub fn new(
        corpus_path: impl Into<PathBuf>,
        snapshot: SnapshotPaths,
        extractor: Arc<dyn ClaimExtractor>,
        embedder: Arc<dyn EmbeddingService>,
        completion: Arc<dyn TextCompletionService>,
    ) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            extractor,
            index: Mutex::new(EvidenceIndex::new(embedder.clone(), snapshot)),
            embedder,
            verifier: VerificationEngine::new(completion),
            reuse_snapshot: false,
        }
    }

    /// Override the per-claim reasoning timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.verifier = self.verifier.with_timeout(timeout);
        self
    }

    /// Reuse a persisted snapshot when it matches the corpus and embedder
    pub fn with_snapshot_reuse(mut self, reuse: bool) -> Self {
        self.reuse_snapshot = reuse;
        self
    }

    /// Wire up the default adapters from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingService> = match config.embedding.backend {
            EmbeddingBackend::Hashed => Arc::new(HashedTokenEmbedder::new(config.embedding.dimension)?),
            EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
                config.embedding.url.clone(),
                config.embedding.model.clone(),
            )?),
        };

        let completion = OllamaCompletion::with_command(
            config.reasoning.program.clone(),
            ["run".to_string(), config.reasoning.model.clone()],
        );

        Ok(Self::new(
            config.facts.clone(),
            config.snapshot_paths(),
            Arc::new(SentenceClaimExtractor::default()),
            embedder,
            Arc::new(completion),
        )
        .with_timeout(config.reasoning.timeout())
        .with_snapshot_reuse(config.retrieval.reuse_snapshot))
    }

    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }

    /// The reasoning service used for verification
    pub fn completion(&self) -> &Arc<dyn TextCompletionService> {
        self.verifier.service()
    }

    /// Check `text` and return one report entry per extracted claim
    #[instrument(skip(self, text), fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&self, text: &str, k: usize) -> Result<Report> {
        if text.trim().is_empty() {
            return Err(FactCheckError::EmptyInput);
        }
        if k == 0 {
            return Err(FactCheckError::InvalidEvidenceCount);
        }

        let facts = load_facts(&self.corpus_path).await?;
        if facts.is_empty() {
            return Err(FactCheckError::EmptyCorpus);
        }

        let mut index = self.index.lock().await;
        self.prepare_index(&mut index, facts).await?;

        let claims = self.extractor.extract(text).await?;
        if claims.is_empty() {
            info!("No claims extracted");
            return Ok(Report::empty(text));
        }

        let rendered: Vec<String> = claims.iter().map(ToString::to_string).collect();
        let vectors = self.embedder.embed(&rendered).await?;
        if vectors.len() != rendered.len() {
            return Err(FactCheckError::EmbeddingFailure(format!(
                "expected {} claim embeddings, got {}",
                rendered.len(),
                vectors.len()
            )));
        }

        let mut retrieved: Vec<Vec<Fact>> = Vec::with_capacity(vectors.len());
        for vector in &vectors {
            retrieved.push(index.search(vector, k)?);
        }
        drop(index);

        let mut reports = Vec::with_capacity(rendered.len());
        for (claim, evidence) in rendered.into_iter().zip(retrieved) {
            debug!(claim = %claim, evidence = evidence.len(), "Verifying claim");
            let analysis = self.verifier.verify(&claim, &evidence).await;
            reports.push(ClaimReport {
                claim,
                evidence,
                analysis,
            });
        }

        info!(claims = reports.len(), "Fact check finished");
        Ok(Report {
            input_text: text.to_string(),
            claims: reports,
        })
    }

    /// Rebuild the index from the corpus and persist it.
    ///
    /// Returns the number of indexed facts.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let facts = load_facts(&self.corpus_path).await?;
        let mut index = self.index.lock().await;
        index.build(facts).await?;
        Ok(index.len())
    }

    /// Search the index directly, loading the persisted snapshot if needed
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredFact>> {
        if query.trim().is_empty() {
            return Err(FactCheckError::EmptyInput);
        }
        if k == 0 {
            return Err(FactCheckError::InvalidEvidenceCount);
        }

        let mut index = self.index.lock().await;
        if !index.is_active() {
            let paths = index.snapshot_paths().clone();
            index.load(&paths).await?;
        }

        let vectors = self.embedder.embed(&[query.trim().to_string()]).await?;
        let vector = vectors.first().ok_or_else(|| {
            FactCheckError::EmbeddingFailure("embedding model produced no embeddings".to_string())
        })?;

        index.search_scored(vector, k)
    }

    /// Build, or reuse a matching snapshot when enabled
    async fn prepare_index(&self, index: &mut EvidenceIndex, facts: Vec<String>) -> Result<()> {
        if self.reuse_snapshot {
            if !index.matches_corpus(&facts) {
                let paths = index.snapshot_paths().clone();
                if let Err(e) = index.load(&paths).await {
                    debug!(error = %e, "No reusable snapshot");
                }
            }
            if index.matches_corpus(&facts) {
                debug!(facts = index.len(), "Reusing evidence index");
                return Ok(());
            }
        }

        index.build(facts).await
    }
}
