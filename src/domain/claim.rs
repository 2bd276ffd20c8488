//! Claims produced by extraction.

use std::collections::BTreeSet;
use std::fmt;

/// A candidate factual claim with the named entities found in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// The sentence or span making the claim
    pub text: String,

    /// Unique entity strings, kept sorted
    pub entities: BTreeSet<String>,
}

impl Claim {
    /// Create a claim with no entities
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: BTreeSet::new(),
        }
    }

    /// Attach entities (blank entries are ignored)
    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entity in entities {
            let entity: String = entity.into();
            let trimmed = entity.trim();
            if !trimmed.is_empty() {
                self.entities.insert(trimmed.to_string());
            }
        }
        self
    }
}

/// Renders `"<text> [Entities: a, b]"`, or just the text when there are none
impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entities.is_empty() {
            return write!(f, "{}", self.text);
        }
        let entities: Vec<&str> = self.entities.iter().map(String::as_str).collect();
        write!(f, "{} [Entities: {}]", self.text, entities.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_claim_renders_text_only() {
        assert_eq!(Claim::new("Water is wet.").to_string(), "Water is wet.");
    }

    #[test]
    fn test_entities_sorted_and_deduplicated() {
        let claim = Claim::new("Paris is the capital of France.")
            .with_entities(["Paris", "France", "Paris", "  "]);
        assert_eq!(
            claim.to_string(),
            "Paris is the capital of France. [Entities: France, Paris]"
        );
    }
}
