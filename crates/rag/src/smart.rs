//! Smart Retriever
//!
//! Wraps another retriever with query understanding:
//!
//! 1. classify the query
//! 2. expand it with category synonyms (the expansion is what gets searched)
//! 3. re-rank candidates lexically against the original query
//! 4. prefer chunks matching the category's metadata filter, unless none do
//! 5. truncate to `k`

use async_trait::async_trait;
use std::sync::Arc;

use folio_core::{Result, RetrieveOptions, Retriever, ScoredChunk};

use crate::classifier::{QueryCategory, QueryClassifier};
use crate::query_expansion::QueryExpander;
use crate::reranker::LexicalScorer;

/// Candidates requested from the inner retriever before filtering
const CANDIDATE_POOL: usize = 50;

/// Classification + expansion + re-ranking over an inner retriever
pub struct SmartRetriever {
    inner: Arc<dyn Retriever>,
    expander: QueryExpander,
}

impl SmartRetriever {
    pub fn new(inner: Arc<dyn Retriever>) -> Self {
        Self {
            inner,
            expander: QueryExpander::new(),
        }
    }

    /// Keep chunks matching any filter pair; an empty outcome keeps everything
    fn soft_filter(category: QueryCategory, ranked: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let filter = QueryClassifier::section_filter(category);
        if filter.is_empty() {
            return ranked;
        }

        let matching = |r: &ScoredChunk| {
            filter
                .iter()
                .any(|(key, value)| r.chunk.metadata_matches(key, value))
        };

        if !ranked.iter().any(matching) {
            tracing::debug!(%category, "No chunk matches the category filter, keeping all");
            return ranked;
        }

        ranked.into_iter().filter(|r| matching(r)).collect()
    }
}

#[async_trait]
impl Retriever for SmartRetriever {
    async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<ScoredChunk>> {
        let category = QueryClassifier::classify(query);
        let expanded = self.expander.expand(query, category);

        tracing::debug!(
            %category,
            original = query,
            expanded = %expanded,
            "Classified and expanded query"
        );

        let candidates = self
            .inner
            .retrieve(&expanded, &RetrieveOptions::default().with_top_k(CANDIDATE_POOL))
            .await?;

        let ranked = LexicalScorer::rerank(query, candidates);
        let mut results = Self::soft_filter(category, ranked);
        results.truncate(options.top_k);

        tracing::debug!(
            %category,
            results = results.len(),
            inner = self.inner.name(),
            "Smart retrieval complete"
        );

        Ok(results)
    }

    fn name(&self) -> &str {
        "smart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Chunk, MatchSource};
    use parking_lot::Mutex;

    /// Returns fixed results and records the query it was asked
    struct FixedRetriever {
        results: Vec<ScoredChunk>,
        seen: Mutex<Vec<String>>,
    }

    impl FixedRetriever {
        fn new(chunks: Vec<Chunk>) -> Arc<Self> {
            Arc::new(Self {
                results: chunks
                    .into_iter()
                    .map(|c| ScoredChunk::new(c, 1.0, MatchSource::Hybrid))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(&self, query: &str, _options: &RetrieveOptions) -> Result<Vec<ScoredChunk>> {
            self.seen.lock().push(query.to_string());
            Ok(self.results.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_expanded_query_is_searched() {
        let inner = FixedRetriever::new(vec![Chunk::with_id("a", "Python")]);
        let smart = SmartRetriever::new(inner.clone());

        smart
            .retrieve("What skills?", &RetrieveOptions::default())
            .await
            .unwrap();

        assert_eq!(inner.seen.lock()[0], "What skills? expertise technologies");
    }

    #[tokio::test]
    async fn test_filter_prefers_matching_section() {
        let inner = FixedRetriever::new(vec![
            Chunk::with_id("other", "Python skills mentioned in a project"),
            Chunk::with_id("skills", "Python").with_metadata("section", "technical_skills"),
        ]);
        let smart = SmartRetriever::new(inner);

        let results = smart
            .retrieve("python skills", &RetrieveOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "skills");
    }

    #[tokio::test]
    async fn test_filter_never_empties_results() {
        // Contact filter wants type=profile; nothing has it
        let inner = FixedRetriever::new(vec![
            Chunk::with_id("misc", "Hiking"),
            Chunk::with_id("contact", "Contact email: foo@example.com")
                .with_metadata("section", "contact"),
        ]);
        let smart = SmartRetriever::new(inner);

        let results = smart
            .retrieve("What is the contact email?", &RetrieveOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "contact");
    }

    #[tokio::test]
    async fn test_rerank_is_monotonic_and_truncated() {
        let inner = FixedRetriever::new(vec![
            Chunk::with_id("low", "unrelated text"),
            Chunk::with_id("mid", "salary expectations"),
            Chunk::with_id("high", "expected salary is negotiable"),
        ]);
        let smart = SmartRetriever::new(inner);

        let results = smart
            .retrieve("expected salary", &RetrieveOptions::default().with_top_k(2))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "high");
        assert_eq!(results[1].chunk.id, "mid");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_empty_inner_results() {
        let smart = SmartRetriever::new(FixedRetriever::new(Vec::new()));
        let results = smart
            .retrieve("What is the expected salary?", &RetrieveOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
