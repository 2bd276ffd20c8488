//! Domain types for the fact-checking pipeline.
//!
//! This module contains the core data structures:
//! - Fact: Corpus statements addressed by ordinal
//! - Claim: Extracted claims with entity annotations
//! - Verdict: Normalized analysis of one claim
//! - Report: Output of a pipeline run

pub mod claim;
pub mod fact;
pub mod report;
pub mod verdict;

// Re-export commonly used types
pub use claim::Claim;
pub use fact::{Fact, ScoredFact};
pub use report::{ClaimReport, Report};
pub use verdict::{Verdict, VerdictLabel};
