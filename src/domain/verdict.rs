//! Verdicts returned by verification.

use serde::{Deserialize, Serialize};

/// The closed three-way verdict vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictLabel {
    True,
    False,
    Unverifiable,
}

impl VerdictLabel {
    /// Map a raw label onto the vocabulary.
    ///
    /// Case-insensitive and total: anything that is not exactly
    /// `true`/`false`/`unverifiable` (after trimming) is `Unverifiable`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "true" => Self::True,
            "false" => Self::False,
            _ => Self::Unverifiable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unverifiable => "Unverifiable",
        }
    }
}

/// Final analysis of one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub verdict: VerdictLabel,

    /// Free-text explanation (model output or fallback diagnostics)
    pub reasoning: String,

    /// Evidence snippets actually cited
    pub evidence: Vec<String>,
}

impl Verdict {
    /// An `Unverifiable` verdict with the given reasoning and cited evidence
    pub fn unverifiable(reasoning: impl Into<String>, evidence: Vec<String>) -> Self {
        Self {
            verdict: VerdictLabel::Unverifiable,
            reasoning: reasoning.into(),
            evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_case_insensitive() {
        assert_eq!(VerdictLabel::normalize("TRUE"), VerdictLabel::True);
        assert_eq!(VerdictLabel::normalize("False"), VerdictLabel::False);
        assert_eq!(VerdictLabel::normalize(" unVerifiable "), VerdictLabel::Unverifiable);
    }

    #[test]
    fn test_normalize_defaults_to_unverifiable() {
        for raw in ["", "yes", "mostly true", "true.", "1", "supported", "truefalse"] {
            assert_eq!(VerdictLabel::normalize(raw), VerdictLabel::Unverifiable, "{raw}");
        }
    }

    #[test]
    fn test_label_serializes_capitalized() {
        let verdict = Verdict {
            verdict: VerdictLabel::True,
            reasoning: "matches".to_string(),
            evidence: vec!["The sky is blue.".to_string()],
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["verdict"], "True");
        assert_eq!(json["evidence"][0], "The sky is blue.");
    }
}
