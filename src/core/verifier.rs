//! Claim verification against retrieved evidence.
//!
//! Every path ends in a `Verdict`:
//! - no evidence: `Unverifiable` without calling the model
//! - service unavailable / failed / timed out: `Unverifiable`, citing all evidence
//! - unparseable response: `Unverifiable`, citing all evidence
//! - parsed response: label normalized onto True/False/Unverifiable
//!
//! There are no retries; one failed attempt is final for the claim.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::adapters::TextCompletionService;
use crate::domain::{Fact, Verdict, VerdictLabel};
use crate::error::{FactCheckError, Result};

/// Default time allowed for one completion
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Reasoning used when retrieval found nothing
pub const NO_EVIDENCE_REASONING: &str = "No supporting evidence could be retrieved.";

/// Reasoning used when the model output cannot be used
pub const MALFORMED_REASONING: &str = "Model response missing or malformed.";

/// Reasoning used for a blank claim
pub const EMPTY_CLAIM_REASONING: &str = "claim text is empty";

const PROMPT_HEADER: &str = "You are a fact-checking engine. Analyze each CLAIM using the retrieved EVIDENCE.\n\
Classify strictly as one of: True (supported), False (contradicted), or Unverifiable (insufficient).\n\
Return JSON only with the keys 'verdict', 'reasoning', and 'evidence'.";

const RESPONSE_SCHEMA: &str = "{\n  \"verdict\": \"True|False|Unverifiable\",\n  \"reasoning\": \"...\",\n  \"evidence\": [\"fact snippet\"]\n}";

/// Build the verification prompt. Evidence is numbered from 1.
pub fn format_prompt(claim: &str, evidence: &[Fact]) -> String {
    let evidence_text = if evidence.is_empty() {
        "No evidence available.".to_string()
    } else {
        evidence
            .iter()
            .enumerate()
            .map(|(i, fact)| format!("{}. {}", i + 1, fact.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{PROMPT_HEADER}\n\nCLAIM:\n{claim}\n\nEVIDENCE:\n{evidence_text}\n\nRespond ONLY with JSON in the form:\n{RESPONSE_SCHEMA}"
    )
}

/// Parse a raw completion into a JSON object
fn parse_response(raw: &str) -> Result<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FactCheckError::MalformedResponse("empty response".to_string()));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(FactCheckError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(FactCheckError::MalformedResponse(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Text form of a JSON value: strings verbatim, everything else as JSON
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalize a raw model response into a verdict.
///
/// `evidence` is the retrieved evidence, cited in full whenever the
/// response does not supply its own list.
pub fn normalize_response(raw: &str, evidence: &[Fact]) -> Verdict {
    let fallback_evidence: Vec<String> = evidence.iter().map(|f| f.text.clone()).collect();

    let parsed = match parse_response(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "Falling back to Unverifiable");
            return Verdict::unverifiable(MALFORMED_REASONING, fallback_evidence);
        }
    };

    let verdict = match parsed.get("verdict") {
        Some(Value::String(label)) => VerdictLabel::normalize(label),
        Some(Value::Bool(flag)) => VerdictLabel::normalize(&flag.to_string()),
        _ => VerdictLabel::Unverifiable,
    };

    let reasoning = match parsed.get("reasoning") {
        None | Some(Value::Null) => MALFORMED_REASONING.to_string(),
        Some(value) => {
            let text = value_text(value);
            if text.is_empty() {
                MALFORMED_REASONING.to_string()
            } else {
                text
            }
        }
    };

    let evidence = match parsed.get("evidence") {
        Some(Value::Array(items)) => items.iter().map(value_text).collect(),
        _ => fallback_evidence,
    };

    Verdict {
        verdict,
        reasoning,
        evidence,
    }
}

/// Runs claims past the reasoning service
pub struct VerificationEngine {
    service: Arc<dyn TextCompletionService>,
    timeout: Duration,
}

impl VerificationEngine {
    /// Create an engine with the default 120 second timeout
    pub fn new(service: Arc<dyn TextCompletionService>) -> Self {
        Self {
            service,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-claim timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying completion service
    pub fn service(&self) -> &Arc<dyn TextCompletionService> {
        &self.service
    }

    /// Classify one claim. Never fails.
    pub async fn verify(&self, claim: &str, evidence: &[Fact]) -> Verdict {
        if claim.trim().is_empty() {
            return Verdict::unverifiable(EMPTY_CLAIM_REASONING, Vec::new());
        }

        if evidence.is_empty() {
            debug!("No evidence retrieved; skipping reasoning service");
            return Verdict::unverifiable(NO_EVIDENCE_REASONING, Vec::new());
        }

        let prompt = format_prompt(claim, evidence);

        match self.service.complete(&prompt, self.timeout).await {
            Ok(raw) => normalize_response(&raw, evidence),
            Err(e) => {
                if e.is_external() {
                    warn!(service = self.service.name(), error = %e, "Reasoning service failed");
                } else {
                    error!(service = self.service.name(), error = %e, "Reasoning service call errored");
                }
                Verdict::unverifiable(
                    e.to_string(),
                    evidence.iter().map(|f| f.text.clone()).collect(),
                )
            }
        }
    }
}
