//! The report assembled by a pipeline run.

use serde::Serialize;

use super::fact::Fact;
use super::verdict::Verdict;

/// Output of one pipeline invocation
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// The text exactly as supplied
    pub input_text: String,

    /// One entry per extracted claim, in extraction order
    pub claims: Vec<ClaimReport>,
}

/// Evidence and analysis for a single claim
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReport {
    pub claim: String,
    pub evidence: Vec<Fact>,
    pub analysis: Verdict,
}

impl Report {
    /// A report with no claims
    pub fn empty(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            claims: Vec::new(),
        }
    }

    /// Pretty-printed JSON, as emitted by the CLI
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VerdictLabel;

    #[test]
    fn test_report_shape() {
        let report = Report {
            input_text: "The sky is blue.".to_string(),
            claims: vec![ClaimReport {
                claim: "The sky is blue.".to_string(),
                evidence: vec![Fact::new(0, "The sky is blue.")],
                analysis: Verdict {
                    verdict: VerdictLabel::True,
                    reasoning: "matches".to_string(),
                    evidence: vec!["The sky is blue.".to_string()],
                },
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["input_text"], "The sky is blue.");
        assert_eq!(json["claims"][0]["evidence"][0], "The sky is blue.");
        assert_eq!(json["claims"][0]["analysis"]["verdict"], "True");
    }

    #[test]
    fn test_empty_report() {
        let json = serde_json::to_value(Report::empty("hello")).unwrap();
        assert_eq!(json["claims"].as_array().unwrap().len(), 0);
    }
}
