//! Facts from the curated corpus.
//!
//! A fact is identified by its ordinal position in the corpus it was
//! loaded from. Reports render facts as their plain text.

use serde::{Serialize, Serializer};

/// A single corpus statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    /// Position in the ordered corpus (matches the vector row in the index)
    pub ordinal: usize,

    /// The statement itself
    pub text: String,
}

impl Fact {
    /// Create a new fact
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
        }
    }
}

impl Serialize for Fact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl AsRef<str> for Fact {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// A fact together with its similarity to a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFact {
    pub fact: Fact,

    /// Inner product with the query (cosine for normalized vectors)
    pub score: f32,
}
