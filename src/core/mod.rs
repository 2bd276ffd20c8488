//! Core pipeline logic.
//!
//! This module contains:
//! - Corpus: Fact corpus loading and hashing
//! - Snapshot: On-disk index format with atomic commits
//! - EvidenceIndex: Similarity search over the corpus
//! - VerificationEngine: Claim classification via the reasoning service
//! - Orchestrator: End-to-end pipeline runs

pub mod corpus;
pub mod index;
pub mod orchestrator;
pub mod snapshot;
pub mod verifier;

// Re-export commonly used types
pub use corpus::{corpus_hash, load_facts, parse_facts};
pub use index::EvidenceIndex;
pub use orchestrator::{Orchestrator, DEFAULT_K};
pub use snapshot::{read_snapshot, write_snapshot, IndexBlob, SnapshotMetadata, SnapshotPaths};
pub use verifier::{format_prompt, normalize_response, VerificationEngine};
