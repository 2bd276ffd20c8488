//! The evidence index: a flat inner-product index over the fact corpus.
//!
//! An `EvidenceIndex` holds at most one active index at a time. `build`
//! constructs a complete replacement before swapping it in, then persists it
//! as a snapshot; `load` restores one. Vectors are unit-normalized, so the
//! inner product is cosine similarity.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::adapters::EmbeddingService;
use crate::domain::{Fact, ScoredFact};
use crate::error::{FactCheckError, Result};

use super::corpus::corpus_hash;
use super::snapshot::{read_snapshot, write_snapshot, IndexBlob, SnapshotMetadata, SnapshotPaths};

/// Vectors plus the parallel fact list. Row `i` embeds `metadata.facts[i]`.
#[derive(Debug, Clone)]
struct ActiveIndex {
    blob: IndexBlob,
    metadata: SnapshotMetadata,
}

impl ActiveIndex {
    fn new(blob: IndexBlob, metadata: SnapshotMetadata) -> Result<Self> {
        if blob.len() != metadata.facts.len()
            || blob.vectors.len() != blob.len() * blob.dimension as usize
        {
            return Err(FactCheckError::IndexInconsistent {
                vectors: blob.len(),
                facts: metadata.facts.len(),
            });
        }
        Ok(Self { blob, metadata })
    }
}

/// Similarity index over a fact corpus
pub struct EvidenceIndex {
    embedder: Arc<dyn EmbeddingService>,
    snapshot: SnapshotPaths,
    active: Option<ActiveIndex>,
}

impl EvidenceIndex {
    /// Create an empty index that persists builds to `snapshot`
    pub fn new(embedder: Arc<dyn EmbeddingService>, snapshot: SnapshotPaths) -> Self {
        Self {
            embedder,
            snapshot,
            active: None,
        }
    }

    /// Where `build` writes its snapshot
    pub fn snapshot_paths(&self) -> &SnapshotPaths {
        &self.snapshot
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Number of indexed facts (0 when inactive)
    pub fn len(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.metadata.facts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension of the active index
    pub fn dimension(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.blob.dimension as usize)
    }

    /// Facts of the active index, in ordinal order
    pub fn facts(&self) -> &[String] {
        self.active
            .as_ref()
            .map(|a| a.metadata.facts.as_slice())
            .unwrap_or_default()
    }

    /// Snapshot metadata of the active index
    pub fn metadata(&self) -> Option<&SnapshotMetadata> {
        self.active.as_ref().map(|a| &a.metadata)
    }

    /// Whether the active index was built from exactly this corpus with the
    /// current embedding model
    pub fn matches_corpus(&self, facts: &[String]) -> bool {
        let Some(metadata) = self.metadata() else {
            return false;
        };
        metadata.corpus_sha256.as_deref() == Some(corpus_hash(facts).as_str())
            && metadata.embedding_model.as_deref() == Some(self.embedder.model_id())
    }

    /// Embed `facts`, replace the active index and persist it
    #[instrument(skip(self, facts), fields(facts = facts.len()))]
    pub async fn build(&mut self, facts: Vec<String>) -> Result<()> {
        if facts.is_empty() {
            return Err(FactCheckError::EmptyCorpus);
        }

        let embeddings = self.embedder.embed(&facts).await?;
        let dimension = validate_embeddings(facts.len(), &embeddings)?;
        let vectors: Vec<f32> = embeddings.into_iter().flatten().collect();

        let metadata = SnapshotMetadata {
            corpus_sha256: Some(corpus_hash(&facts)),
            embedding_model: Some(self.embedder.model_id().to_string()),
            dimension: Some(dimension),
            built_at: Some(Utc::now()),
            index_sha256: None,
            facts,
        };
        let active = ActiveIndex::new(IndexBlob::new(dimension, vectors), metadata)?;

        self.active = Some(active);
        info!(facts = self.len(), dimension, "Evidence index built");

        let paths = self.snapshot.clone();
        self.persist(&paths).await
    }

    /// Write the active index to `paths`
    pub async fn persist(&self, paths: &SnapshotPaths) -> Result<()> {
        let active = self.active.as_ref().ok_or(FactCheckError::NoActiveIndex)?;
        write_snapshot(paths, &active.blob, &active.metadata).await
    }

    /// Replace the active index with the snapshot at `paths`.
    ///
    /// On failure the previously active index is kept.
    pub async fn load(&mut self, paths: &SnapshotPaths) -> Result<()> {
        let (blob, metadata) = read_snapshot(paths).await?;
        let active = ActiveIndex::new(blob, metadata).map_err(|e| FactCheckError::CorruptSnapshot {
            path: paths.index.clone(),
            reason: e.to_string(),
        })?;

        self.active = Some(active);
        info!(facts = self.len(), path = %paths.index.display(), "Evidence index loaded");
        Ok(())
    }

    /// Top-`k` facts for a query vector, most similar first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Fact>> {
        Ok(self
            .search_scored(query, k)?
            .into_iter()
            .map(|hit| hit.fact)
            .collect())
    }

    /// Top-`k` facts with their scores.
    ///
    /// `k` is clamped to the corpus size. Equal scores are ordered by
    /// ascending ordinal. Matches whose ordinal has no fact are dropped.
    pub fn search_scored(&self, query: &[f32], k: usize) -> Result<Vec<ScoredFact>> {
        let active = self.active.as_ref().ok_or(FactCheckError::NoActiveIndex)?;
        let facts = &active.metadata.facts;

        let dimension = active.blob.dimension as usize;
        if query.len() != dimension {
            return Err(FactCheckError::DimensionMismatch {
                expected: dimension,
                got: query.len(),
            });
        }

        let k = k.min(facts.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = active
            .blob
            .rows()
            .enumerate()
            .map(|(ordinal, row)| {
                let score = inner_product(row, query);
                (ordinal, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let hits = scored
            .into_iter()
            .take(k)
            .filter_map(|(ordinal, score)| match facts.get(ordinal) {
                Some(text) => Some(ScoredFact {
                    fact: Fact::new(ordinal, text.clone()),
                    score,
                }),
                None => {
                    warn!(ordinal, corpus_size = facts.len(), "Dropping match outside the corpus");
                    None
                }
            })
            .collect();

        Ok(hits)
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Check an embedding batch and return its dimension
pub fn validate_embeddings(expected: usize, embeddings: &[Vec<f32>]) -> Result<usize> {
    let first = embeddings
        .first()
        .ok_or_else(|| FactCheckError::EmbeddingFailure("embedding model produced no embeddings".to_string()))?;

    if embeddings.len() != expected {
        return Err(FactCheckError::EmbeddingFailure(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }

    let dimension = first.len();
    if dimension == 0 {
        return Err(FactCheckError::EmbeddingFailure(
            "embeddings have zero dimension".to_string(),
        ));
    }

    if let Some(pos) = embeddings.iter().position(|v| v.len() != dimension) {
        return Err(FactCheckError::EmbeddingFailure(format!(
            "embedding {} has dimension {}, expected {}",
            pos,
            embeddings[pos].len(),
            dimension
        )));
    }

    Ok(dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Embeds known strings to fixed vectors
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> Arc<Self> {
            Arc::new(Self {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl EmbeddingService for TableEmbedder {
        fn model_id(&self) -> &str {
            "table"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
                .collect())
        }
    }

    /// Returns a fixed batch regardless of input
    struct FixedEmbedder(Vec<Vec<f32>>);

    #[async_trait]
    impl EmbeddingService for FixedEmbedder {
        fn model_id(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(self.0.clone())
        }
    }

    fn facts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_search_before_build_fails() {
        let temp = TempDir::new().unwrap();
        let index = EvidenceIndex::new(TableEmbedder::new(&[]), SnapshotPaths::in_dir(temp.path()));
        assert!(matches!(index.search(&[1.0, 0.0], 1), Err(FactCheckError::NoActiveIndex)));
        assert!(matches!(
            index.persist(&SnapshotPaths::in_dir(temp.path())).await,
            Err(FactCheckError::NoActiveIndex)
        ));
    }

    #[tokio::test]
    async fn test_empty_corpus_rejected() {
        let temp = TempDir::new().unwrap();
        let mut index = EvidenceIndex::new(TableEmbedder::new(&[]), SnapshotPaths::in_dir(temp.path()));
        assert!(matches!(index.build(Vec::new()).await, Err(FactCheckError::EmptyCorpus)));
        assert!(!index.is_active());
    }

    #[tokio::test]
    async fn test_ranking_and_tie_break() {
        let temp = TempDir::new().unwrap();
        let embedder = TableEmbedder::new(&[
            ("a", vec![0.6, 0.8]),
            ("b", vec![1.0, 0.0]),
            ("c", vec![1.0, 0.0]),
            ("d", vec![0.0, 1.0]),
        ]);
        let mut index = EvidenceIndex::new(embedder, SnapshotPaths::in_dir(temp.path()));
        index.build(facts(&["a", "b", "c", "d"])).await.unwrap();

        let hits = index.search_scored(&[1.0, 0.0], 4).unwrap();
        let ordinals: Vec<usize> = hits.iter().map(|h| h.fact.ordinal).collect();
        // b and c tie at 1.0; the lower ordinal wins
        assert_eq!(ordinals, vec![1, 2, 0, 3]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_k_is_clamped() {
        let temp = TempDir::new().unwrap();
        let embedder = TableEmbedder::new(&[("only", vec![1.0, 0.0])]);
        let mut index = EvidenceIndex::new(embedder, SnapshotPaths::in_dir(temp.path()));
        index.build(facts(&["only"])).await.unwrap();

        assert_eq!(index.search(&[1.0, 0.0], 3).unwrap().len(), 1);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        let embedder = TableEmbedder::new(&[("x", vec![1.0, 0.0])]);
        let mut index = EvidenceIndex::new(embedder, SnapshotPaths::in_dir(temp.path()));
        index.build(facts(&["x"])).await.unwrap();

        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(FactCheckError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[tokio::test]
    async fn test_inconsistent_embeddings_rejected() {
        let temp = TempDir::new().unwrap();
        let paths = SnapshotPaths::in_dir(temp.path());

        let ragged = Arc::new(FixedEmbedder(vec![vec![1.0, 0.0], vec![1.0]]));
        let mut index = EvidenceIndex::new(ragged, paths.clone());
        assert!(matches!(
            index.build(facts(&["a", "b"])).await,
            Err(FactCheckError::EmbeddingFailure(_))
        ));

        let empty = Arc::new(FixedEmbedder(Vec::new()));
        let mut index = EvidenceIndex::new(empty, paths.clone());
        assert!(matches!(
            index.build(facts(&["a"])).await,
            Err(FactCheckError::EmbeddingFailure(_))
        ));

        let short = Arc::new(FixedEmbedder(vec![vec![1.0, 0.0]]));
        let mut index = EvidenceIndex::new(short, paths);
        assert!(matches!(
            index.build(facts(&["a", "b"])).await,
            Err(FactCheckError::EmbeddingFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_build_persists_snapshot_with_metadata() {
        let temp = TempDir::new().unwrap();
        let paths = SnapshotPaths::in_dir(temp.path().join("index"));
        let embedder = TableEmbedder::new(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let mut index = EvidenceIndex::new(embedder, paths.clone());
        let corpus = facts(&["a", "b"]);
        index.build(corpus.clone()).await.unwrap();

        assert!(paths.index.exists());
        assert!(paths.metadata.exists());
        assert!(index.matches_corpus(&corpus));
        assert!(!index.matches_corpus(&facts(&["a"])));

        let metadata = index.metadata().unwrap();
        assert_eq!(metadata.embedding_model.as_deref(), Some("table"));
        assert_eq!(metadata.dimension, Some(2));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_active_index() {
        let temp = TempDir::new().unwrap();
        let embedder = TableEmbedder::new(&[("a", vec![1.0, 0.0])]);
        let mut index = EvidenceIndex::new(embedder, SnapshotPaths::in_dir(temp.path().join("index")));
        index.build(facts(&["a"])).await.unwrap();

        let missing = SnapshotPaths::in_dir(temp.path().join("missing"));
        assert!(matches!(
            index.load(&missing).await,
            Err(FactCheckError::SnapshotNotFound { .. })
        ));
        assert_eq!(index.facts(), &["a".to_string()]);
    }

    #[test]
    fn test_active_index_rejects_skew() {
        let blob = IndexBlob::new(2, vec![1.0, 0.0, 0.0, 1.0]);
        let metadata = SnapshotMetadata {
            facts: facts(&["a"]),
            ..Default::default()
        };
        assert!(matches!(
            ActiveIndex::new(blob, metadata),
            Err(FactCheckError::IndexInconsistent { vectors: 2, facts: 1 })
        ));
    }
}
