//! Hybrid Retriever
//!
//! Runs semantic and keyword search concurrently over one index snapshot and
//! fuses the two ranked lists with weighted reciprocal rank fusion:
//!
//! ```text
//! score(chunk) = Σ_channel weight_channel / (rrf_k + rank_channel + 1)
//! ```
//!
//! Raw scores (cosine vs. BM25) are never blended; only ranks are. A chunk
//! found by both channels therefore outranks one found by a single channel
//! at the same rank.
//!
//! If one channel fails the other channel's results are returned and the
//! degradation is logged. Only when both fail does the error propagate.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use folio_config::constants::rag;
use folio_core::{Chunk, MatchSource, RetrieveOptions, Retriever, ScoredChunk};

use crate::index::{IndexSet, KnowledgeIndex};
use crate::RagError;

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Candidates from semantic search
    pub semantic_top_k: usize,
    /// Candidates from keyword search
    pub keyword_top_k: usize,
    /// RRF k parameter
    pub rrf_k: f32,
    /// Initial fusion weights
    pub weights: FusionWeights,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            semantic_top_k: rag::TOP_K_RESULTS,
            keyword_top_k: rag::TOP_K_RESULTS,
            rrf_k: rag::RRF_K,
            weights: FusionWeights::default(),
        }
    }
}

impl From<&folio_config::RagConfig> for RetrieverConfig {
    fn from(config: &folio_config::RagConfig) -> Self {
        Self {
            semantic_top_k: config.semantic_top_k,
            keyword_top_k: config.keyword_top_k,
            rrf_k: config.rrf_k,
            weights: FusionWeights {
                semantic: config.semantic_weight,
                keyword: config.keyword_weight,
            },
        }
    }
}

/// Per-channel fusion weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub semantic: f32,
    pub keyword: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            semantic: rag::SEMANTIC_WEIGHT,
            keyword: rag::KEYWORD_WEIGHT,
        }
    }
}

impl FusionWeights {
    fn validate(&self) -> Result<(), RagError> {
        let finite = self.semantic.is_finite() && self.keyword.is_finite();
        if !finite || self.semantic < 0.0 || self.keyword < 0.0 {
            return Err(RagError::Configuration(format!(
                "fusion weights must be non-negative, got semantic={} keyword={}",
                self.semantic, self.keyword
            )));
        }
        if self.semantic + self.keyword <= 0.0 {
            return Err(RagError::Configuration(
                "at least one fusion weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keyword channel of the hybrid retriever
///
/// Runs on a blocking thread against one index snapshot.
pub trait KeywordChannel: Send + Sync {
    /// Top-k chunk ids, best first
    fn search(&self, set: &IndexSet, query: &str, top_k: usize) -> Result<Vec<String>, RagError>;
}

/// BM25 over the snapshot's Tantivy index
pub struct Bm25Channel;

impl KeywordChannel for Bm25Channel {
    fn search(&self, set: &IndexSet, query: &str, top_k: usize) -> Result<Vec<String>, RagError> {
        Ok(set
            .sparse()
            .search(query, top_k)?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }
}

/// Hybrid retriever combining semantic and keyword search
pub struct HybridRetriever {
    index: Arc<KnowledgeIndex>,
    keyword: Arc<dyn KeywordChannel>,
    config: RetrieverConfig,
    weights: RwLock<FusionWeights>,
}

impl HybridRetriever {
    pub fn new(index: Arc<KnowledgeIndex>, config: RetrieverConfig) -> Result<Self, RagError> {
        config.weights.validate()?;
        let weights = RwLock::new(config.weights);
        Ok(Self {
            index,
            keyword: Arc::new(Bm25Channel),
            config,
            weights,
        })
    }

    /// Replace the keyword channel (BM25 by default)
    pub fn with_keyword_channel(mut self, keyword: Arc<dyn KeywordChannel>) -> Self {
        self.keyword = keyword;
        self
    }

    /// Current fusion weights
    pub fn weights(&self) -> FusionWeights {
        *self.weights.read()
    }

    /// Replace the fusion weights; the indexes are untouched
    pub fn update_weights(&self, semantic: f32, keyword: f32) -> Result<(), RagError> {
        let weights = FusionWeights { semantic, keyword };
        weights.validate()?;
        *self.weights.write() = weights;
        tracing::info!(semantic, keyword, "Updated fusion weights");
        Ok(())
    }

    /// Semantic channel: top-k chunk ids by cosine similarity
    async fn search_semantic(&self, set: &IndexSet, query: &str) -> Result<Vec<String>, RagError> {
        let vector = self
            .index
            .embedder()
            .embed_query(query)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let matches = set.semantic().search(&vector, self.config.semantic_top_k)?;
        Ok(matches
            .into_iter()
            .filter_map(|m| set.semantic().chunk(m.position).map(|c| c.id.clone()))
            .collect())
    }

    /// Keyword channel: top-k chunk ids
    async fn search_keyword(&self, set: Arc<IndexSet>, query: &str) -> Result<Vec<String>, RagError> {
        let query = query.to_string();
        let top_k = self.config.keyword_top_k;
        let keyword = self.keyword.clone();

        // Tantivy search is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || keyword.search(&set, &query, top_k))
            .await
            .map_err(|e| RagError::Search(format!("Keyword search task failed: {}", e)))?
    }

    /// Hybrid search over the current index snapshot
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredChunk>, RagError> {
        let set = self.index.snapshot()?;

        let (semantic, keyword) = tokio::join!(
            self.search_semantic(&set, query),
            self.search_keyword(set.clone(), query)
        );

        let (semantic, keyword) = match (semantic, keyword) {
            (Ok(s), Ok(k)) => (s, k),
            (Ok(s), Err(e)) => {
                degraded("keyword", &e);
                (s, Vec::new())
            },
            (Err(e), Ok(k)) => {
                degraded("semantic", &e);
                (Vec::new(), k)
            },
            (Err(semantic_err), Err(keyword_err)) => {
                tracing::error!(
                    semantic = %semantic_err,
                    keyword = %keyword_err,
                    "Both retrieval channels failed"
                );
                return Err(RagError::Search(format!(
                    "semantic: {}; keyword: {}",
                    semantic_err, keyword_err
                )));
            },
        };

        let fused = rrf_fusion(&semantic, &keyword, self.weights(), self.config.rrf_k);

        Ok(fused
            .into_iter()
            .filter_map(|(id, score, source)| {
                set.chunk(&id)
                    .map(|chunk: &Chunk| ScoredChunk::new(chunk.clone(), score, source))
            })
            .collect())
    }
}

fn degraded(channel: &'static str, error: &RagError) {
    let err = folio_core::Error::RetrievalDegraded {
        channel: channel.to_string(),
        message: error.to_string(),
    };
    tracing::warn!(channel, error = %err, "Falling back to single-channel retrieval");
    metrics::counter!("folio_retrieval_degraded_total", "channel" => channel).increment(1);
}

/// Weighted reciprocal rank fusion
///
/// Output is sorted by fused score, descending; ties keep first-seen order
/// (semantic list first, then keyword).
pub fn rrf_fusion(
    semantic: &[String],
    keyword: &[String],
    weights: FusionWeights,
    rrf_k: f32,
) -> Vec<(String, f32, MatchSource)> {
    let mut order: Vec<String> = Vec::new();
    let mut scores: HashMap<String, (f32, MatchSource)> = HashMap::new();

    let channels = [
        (semantic, weights.semantic, MatchSource::Semantic),
        (keyword, weights.keyword, MatchSource::Keyword),
    ];

    for (ids, weight, source) in channels {
        for (rank, id) in ids.iter().enumerate() {
            let contribution = weight / (rrf_k + rank as f32 + 1.0);
            match scores.get_mut(id) {
                Some((score, seen)) => {
                    *score += contribution;
                    if *seen != source {
                        *seen = MatchSource::Hybrid;
                    }
                },
                None => {
                    order.push(id.clone());
                    scores.insert(id.clone(), (contribution, source));
                },
            }
        }
    }

    let mut fused: Vec<(String, f32, MatchSource)> = order
        .into_iter()
        .filter_map(|id| scores.remove(&id).map(|(score, source)| (id, score, source)))
        .collect();

    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> folio_core::Result<Vec<ScoredChunk>> {
        let mut results = self.search(query).await?;
        results.truncate(options.top_k);
        Ok(results)
    }

    fn name(&self) -> &str {
        "hybrid"
    }
}
