//! Fact corpus loading.
//!
//! The corpus is a CSV file with a `fact` column. Other columns are
//! ignored and rows with a missing or blank fact are dropped.

use std::io::ErrorKind;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::error::{FactCheckError, Result};

/// Name of the required column
pub const FACT_COLUMN: &str = "fact";

/// Load fact statements from a CSV file
pub async fn load_facts(path: &Path) -> Result<Vec<String>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(FactCheckError::CorpusNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let facts = parse_facts(&bytes).map_err(|reason| FactCheckError::CorpusFormat {
        path: path.to_path_buf(),
        reason,
    })?;

    debug!(count = facts.len(), path = %path.display(), "Loaded facts");
    Ok(facts)
}

/// Parse CSV bytes into trimmed, non-blank facts
pub fn parse_facts(bytes: &[u8]) -> std::result::Result<Vec<String>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(|e| e.to_string())?;
    let column = headers
        .iter()
        .position(|h| h.trim() == FACT_COLUMN)
        .ok_or_else(|| format!("missing '{}' column", FACT_COLUMN))?;

    let mut facts = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        if let Some(value) = record.get(column) {
            let value = value.trim();
            if !value.is_empty() {
                facts.push(value.to_string());
            }
        }
    }

    Ok(facts)
}

/// Content hash of an ordered corpus, as "sha256:<hex>"
///
/// Each fact is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn corpus_hash(facts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for fact in facts {
        hasher.update((fact.len() as u64).to_le_bytes());
        hasher.update(fact.as_bytes());
    }
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
