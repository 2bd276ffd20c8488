//! factcheck - claim verification against a curated fact corpus
//!
//! Splits free text into claims, retrieves the most similar facts from an
//! embedding index, and asks a local reasoning model for a verdict on each.
//!
//! # Pipeline
//!
//! - Load the fact corpus (CSV with a `fact` column)
//! - Build (or reuse) the evidence index and persist it as a snapshot
//! - Extract claims, embed them in one batch, retrieve top-k facts
//! - Verify each claim; service failures degrade to `Unverifiable`
//!
//! # Modules
//!
//! - `adapters`: Reasoning, embedding and extraction backends
//! - `core`: Corpus, index, snapshot, verifier and orchestrator
//! - `domain`: Data structures (Claim, Fact, Verdict, Report)
//! - `config`: Configuration resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Check text (prompts when no input is given)
//! echo "The sky is blue during the day." | factcheck check
//!
//! # Rebuild and query the index
//! factcheck index build
//! factcheck index search "boiling point of water" -k 2
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use crate::core::{EvidenceIndex, Orchestrator, SnapshotPaths, VerificationEngine};
pub use crate::domain::{Claim, ClaimReport, Fact, Report, ScoredFact, Verdict, VerdictLabel};
pub use crate::error::{FactCheckError, Result};
