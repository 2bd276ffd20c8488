//! On-disk index snapshots.
//!
//! A snapshot is two co-located files:
//! - `index.bin`: bincode-encoded flat inner-product index
//! - `facts_meta.json`: `{"facts": [...]}` plus optional build metadata
//!
//! Both are written to a temporary sibling and renamed into place. If the
//! metadata cannot be committed the index blob is removed, so a half-written
//! snapshot reads as missing and forces a rebuild. The metadata records the
//! SHA-256 of the blob it was committed with; a blob paired with another
//! commit's metadata reads as corrupt. Writers hold an exclusive
//! advisory lock on `.lock` in the snapshot directory; readers a shared one.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{FactCheckError, Result};

/// Index blob file name
pub const INDEX_FILE: &str = "index.bin";

/// Fact metadata sidecar file name
pub const METADATA_FILE: &str = "facts_meta.json";

const LOCK_FILE: &str = ".lock";

/// Blob format version
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Similarity metric recorded in the blob
pub const METRIC_INNER_PRODUCT: &str = "inner_product";

/// Locations of the two snapshot artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl SnapshotPaths {
    /// Standard file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            index: dir.join(INDEX_FILE),
            metadata: dir.join(METADATA_FILE),
        }
    }

    /// Directory holding the index blob
    pub fn dir(&self) -> &Path {
        self.index.parent().unwrap_or(Path::new("."))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir().join(LOCK_FILE)
    }
}

/// Flat inner-product index: `count` rows of `dimension` floats, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBlob {
    pub version: u32,
    pub metric: String,
    pub dimension: u32,
    pub count: u64,
    pub vectors: Vec<f32>,
}

impl IndexBlob {
    /// Wrap row-major vectors of the given dimension
    pub fn new(dimension: usize, vectors: Vec<f32>) -> Self {
        let count = if dimension == 0 { 0 } else { vectors.len() / dimension };
        Self {
            version: INDEX_FORMAT_VERSION,
            metric: METRIC_INNER_PRODUCT.to_string(),
            dimension: dimension as u32,
            count: count as u64,
            vectors,
        }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over rows in ordinal order
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.chunks_exact(self.dimension.max(1) as usize)
    }

    /// Check header fields against the payload
    fn validate(&self) -> std::result::Result<(), String> {
        if self.version != INDEX_FORMAT_VERSION {
            return Err(format!("unsupported index format version {}", self.version));
        }
        if self.metric != METRIC_INNER_PRODUCT {
            return Err(format!("unsupported metric '{}'", self.metric));
        }
        if self.dimension == 0 {
            return Err("index dimension is zero".to_string());
        }
        let expected = (self.dimension as u64).checked_mul(self.count);
        if expected != Some(self.vectors.len() as u64) {
            return Err(format!(
                "expected {} x {} floats, found {}",
                self.count,
                self.dimension,
                self.vectors.len()
            ));
        }
        Ok(())
    }
}

/// The JSON sidecar. Only `facts` is required on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default)]
    pub facts: Vec<String>,

    /// Hash of the corpus the index was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_sha256: Option<String>,

    /// Embedding model used for the vectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,

    /// Hash of the `index.bin` bytes committed alongside this sidecar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_sha256: Option<String>,
}

/// Advisory lock on the snapshot directory, released on drop
struct SnapshotLock {
    file: File,
}

impl SnapshotLock {
    async fn exclusive(path: PathBuf) -> Result<Self> {
        Self::acquire(path, true).await
    }

    async fn shared(path: PathBuf) -> Result<Self> {
        Self::acquire(path, false).await
    }

    async fn acquire(path: PathBuf, exclusive: bool) -> Result<Self> {
        let lock = tokio::task::spawn_blocking(move || -> std::io::Result<Self> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            if exclusive {
                file.lock_exclusive()?;
            } else {
                FileExt::lock_shared(&file)?;
            }
            Ok(Self { file })
        })
        .await
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e))??;

        Ok(lock)
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "Failed to release snapshot lock");
        }
    }
}

/// `sha256:<hex>` digest of an encoded blob
fn blob_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write to a temporary sibling, then rename over the target
async fn commit_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Persist a snapshot as one logical commit
pub async fn write_snapshot(
    paths: &SnapshotPaths,
    blob: &IndexBlob,
    metadata: &SnapshotMetadata,
) -> Result<()> {
    fs::create_dir_all(paths.dir()).await?;
    if let Some(parent) = paths.metadata.parent() {
        fs::create_dir_all(parent).await?;
    }

    let blob_bytes = bincode::serialize(blob)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
    let committed = SnapshotMetadata {
        index_sha256: Some(blob_digest(&blob_bytes)),
        ..metadata.clone()
    };
    let metadata_bytes = serde_json::to_vec_pretty(&committed)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

    let _lock = SnapshotLock::exclusive(paths.lock_path()).await?;

    commit_file(&paths.index, &blob_bytes).await?;

    if let Err(e) = commit_file(&paths.metadata, &metadata_bytes).await {
        warn!(error = %e, "Failed to write facts metadata; invalidating index snapshot");
        if let Err(remove_err) = fs::remove_file(&paths.index).await {
            warn!(error = %remove_err, "Failed to remove orphaned index blob");
        }
        return Err(e);
    }

    debug!(
        index = %paths.index.display(),
        facts = metadata.facts.len(),
        "Snapshot written"
    );
    Ok(())
}

/// Read and validate both halves of a snapshot
pub async fn read_snapshot(paths: &SnapshotPaths) -> Result<(IndexBlob, SnapshotMetadata)> {
    if !fs::try_exists(&paths.index).await.unwrap_or(false) {
        return Err(FactCheckError::SnapshotNotFound {
            path: paths.index.clone(),
        });
    }

    let _lock = SnapshotLock::shared(paths.lock_path()).await?;

    let corrupt = |reason: String| FactCheckError::CorruptSnapshot {
        path: paths.index.clone(),
        reason,
    };

    let blob_bytes = match fs::read(&paths.index).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(FactCheckError::SnapshotNotFound {
                path: paths.index.clone(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let blob: IndexBlob = bincode::deserialize(&blob_bytes)
        .map_err(|e| corrupt(format!("cannot decode index: {}", e)))?;
    blob.validate().map_err(corrupt)?;

    let metadata_bytes = match fs::read(&paths.metadata).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(corrupt("Missing facts metadata".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata: SnapshotMetadata = serde_json::from_slice(&metadata_bytes)
        .map_err(|e| corrupt(format!("cannot parse facts metadata: {}", e)))?;

    if metadata.facts.is_empty() {
        return Err(corrupt("Missing facts metadata".to_string()));
    }

    if let Some(expected) = metadata.index_sha256.as_deref() {
        let actual = blob_digest(&blob_bytes);
        if actual != expected {
            return Err(corrupt(format!(
                "facts metadata belongs to index {}, found {}",
                expected, actual
            )));
        }
    }

    if metadata.facts.len() != blob.len() {
        return Err(corrupt(format!(
            "index has {} vectors but metadata lists {} facts",
            blob.len(),
            metadata.facts.len()
        )));
    }

    Ok((blob, metadata))
}
