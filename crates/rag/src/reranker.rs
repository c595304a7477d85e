//! Lexical Re-ranking
//!
//! Transparent relevance score computed against the original (unexpanded)
//! query:
//!
//! ```text
//! score = 2.0 * |query_words ∩ chunk_words|
//!       + 5.0 * [whole query is a substring of the chunk]
//!       + 1.5 * |{ w in query_words : w is a substring of the chunk }|
//! ```
//!
//! Words are lowercased and whitespace-delimited. Sorting is stable, so
//! equal scores keep the order the retriever produced.

use std::collections::HashSet;

use folio_core::ScoredChunk;

const SHARED_WORD_WEIGHT: f32 = 2.0;
const EXACT_MATCH_BONUS: f32 = 5.0;
const PARTIAL_MATCH_WEIGHT: f32 = 1.5;

/// Lexical relevance scorer
pub struct LexicalScorer;

impl LexicalScorer {
    /// Relevance of `content` to `query`
    pub fn score(query: &str, content: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let content_lower = content.to_lowercase();

        let query_words: HashSet<&str> = query_lower.split_whitespace().collect();
        let content_words: HashSet<&str> = content_lower.split_whitespace().collect();

        let shared = query_words.intersection(&content_words).count() as f32;

        let exact = if !query_lower.trim().is_empty() && content_lower.contains(query_lower.as_str()) {
            EXACT_MATCH_BONUS
        } else {
            0.0
        };

        let partial = query_words
            .iter()
            .filter(|w| content_lower.contains(*w))
            .count() as f32;

        SHARED_WORD_WEIGHT * shared + exact + PARTIAL_MATCH_WEIGHT * partial
    }

    /// Re-order results by lexical relevance, replacing their scores
    pub fn rerank(query: &str, results: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = results
            .into_iter()
            .map(|mut r| {
                r.score = Self::score(query, &r.chunk.text);
                r
            })
            .collect();

        // Vec::sort_by is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Chunk, MatchSource};

    fn scored(id: &str, text: &str) -> ScoredChunk {
        ScoredChunk::new(Chunk::with_id(id, text), 0.0, MatchSource::Hybrid)
    }

    #[test]
    fn test_score_formula() {
        // shared {contact, email} = 2 -> 4.0
        // exact "contact email" substring -> 5.0
        // partial {contact, email} = 2 -> 3.0
        let score = LexicalScorer::score("contact email", "Contact email: foo@example.com");
        assert!((score - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_without_shared() {
        // "python" appears inside "python," but not as a whole word
        let score = LexicalScorer::score("python", "Languages: python, rust");
        assert!((score - (5.0 + 1.5)).abs() < 1e-6);
    }

    #[test]
    fn test_no_overlap_scores_zero() {
        assert_eq!(LexicalScorer::score("salary", "Education: MSc"), 0.0);
    }

    #[test]
    fn test_rerank_monotonic_and_stable() {
        let results = vec![
            scored("a", "nothing relevant here"),
            scored("b", "also unrelated"),
            scored("c", "Rust and Python skills"),
        ];
        let ranked = LexicalScorer::rerank("python skills", results);

        assert_eq!(ranked[0].chunk.id, "c");
        // a and b tie at zero and keep their original relative order
        assert_eq!(ranked[1].chunk.id, "a");
        assert_eq!(ranked[2].chunk.id, "b");
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
