//! Heuristic sentence-level claim extraction.
//!
//! Splits text into sentences, keeps those long enough to assert something,
//! and tags runs of capitalized words as entities. When nothing qualifies the
//! whole trimmed input becomes the only claim.

use async_trait::async_trait;

use super::ClaimExtractor;
use crate::domain::Claim;
use crate::error::Result;

/// Minimum word count for a sentence to be treated as a claim
pub const DEFAULT_MIN_WORDS: usize = 5;

/// Capitalized words that usually just start a sentence
const SENTENCE_STARTERS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "for", "he", "her", "his", "i", "if", "in", "it", "its",
    "many", "most", "my", "no", "on", "our", "she", "so", "some", "that", "the", "their", "there",
    "these", "they", "this", "those", "we", "when", "while", "yes", "you",
];

/// Sentence splitter with capitalized-run entity tagging
#[derive(Debug, Clone)]
pub struct SentenceClaimExtractor {
    min_words: usize,
}

impl Default for SentenceClaimExtractor {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
        }
    }
}

impl SentenceClaimExtractor {
    /// Extract claims synchronously
    pub fn extract_claims(&self, text: &str) -> Vec<Claim> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let claims: Vec<Claim> = split_sentences(trimmed)
            .into_iter()
            .filter(|s| s.split_whitespace().count() >= self.min_words)
            .map(|s| Claim::new(s).with_entities(find_entities(s)))
            .collect();

        if claims.is_empty() {
            return vec![Claim::new(trimmed)];
        }
        claims
    }
}

#[async_trait]
impl ClaimExtractor for SentenceClaimExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<Claim>> {
        Ok(self.extract_claims(text))
    }
}

/// Split on `.`, `!` or `?` followed by whitespace, and on line breaks
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' => match chars.peek() {
                Some((_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                None => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };

        if let Some(end) = boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Runs of capitalized words, minus a lone sentence-initial function word
fn find_entities(sentence: &str) -> Vec<String> {
    let mut entities = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut run_starts_sentence = false;

    let words: Vec<&str> = sentence
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .collect();

    for (idx, word) in words.iter().enumerate() {
        let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());
        if capitalized {
            if run.is_empty() {
                run_starts_sentence = idx == 0;
            }
            run.push(*word);
        } else {
            flush_run(&mut run, run_starts_sentence, &mut entities);
        }
    }
    flush_run(&mut run, run_starts_sentence, &mut entities);

    entities
}

fn flush_run(run: &mut Vec<&str>, starts_sentence: bool, entities: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    let mut words: &[&str] = run;
    if starts_sentence && SENTENCE_STARTERS.contains(&words[0].to_lowercase().as_str()) {
        words = &words[1..];
    }
    if !words.is_empty() {
        entities.push(words.join(" "));
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_yields_nothing() {
        let extractor = SentenceClaimExtractor::default();
        assert!(extractor.extract_claims("   \n ").is_empty());
    }

    #[test]
    fn test_short_text_falls_back_to_whole_input() {
        let extractor = SentenceClaimExtractor::default();
        let claims = extractor.extract_claims("  Sky blue.  ");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].to_string(), "Sky blue.");
    }

    #[test]
    fn test_sentences_are_split_in_order() {
        let extractor = SentenceClaimExtractor::default();
        let claims = extractor
            .extract_claims("The sky is blue during the day. Ok. Water boils at 100 degrees at sea level!");
        let texts: Vec<String> = claims.iter().map(|c| c.text.clone()).collect();
        assert_eq!(
            texts,
            vec![
                "The sky is blue during the day.".to_string(),
                "Water boils at 100 degrees at sea level!".to_string(),
            ]
        );
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        assert_eq!(split_sentences("Pi is about 3.14 in value."), vec!["Pi is about 3.14 in value."]);
    }

    #[test]
    fn test_entities_are_annotated() {
        let extractor = SentenceClaimExtractor::default();
        let claims =
            extractor.extract_claims("The Eiffel Tower was completed in Paris in 1889 by Gustave Eiffel.");
        assert_eq!(claims.len(), 1);
        assert_eq!(
            claims[0].to_string(),
            "The Eiffel Tower was completed in Paris in 1889 by Gustave Eiffel. [Entities: Eiffel Tower, Gustave Eiffel, Paris]"
        );
    }

    #[test]
    fn test_sentence_initial_function_word_is_not_an_entity() {
        assert!(find_entities("The sky is blue and water boils at 100 degrees.").is_empty());
    }
}
