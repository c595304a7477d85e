//! Retrieval traits for RAG

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, ScoredChunk};

/// Retriever interface for RAG
///
/// Implementations:
/// - `HybridRetriever` - keyword + semantic indexes with weighted rank fusion
/// - `SmartRetriever` - classification, expansion, re-ranking and soft filtering
///   over another retriever
///
/// # Example
///
/// ```ignore
/// let retriever: Arc<dyn Retriever> = Arc::new(SmartRetriever::new(hybrid));
/// let chunks = retriever
///     .retrieve("What are the main skills?", &RetrieveOptions::default())
///     .await?;
/// ```
#[async_trait]
pub trait Retriever: Send + Sync + 'static {
    /// Retrieve evidence chunks, highest relevance first
    async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<ScoredChunk>>;

    /// Retriever name for logging
    fn name(&self) -> &str;
}

/// Retrieval options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveOptions {
    /// Number of chunks to return
    pub top_k: usize,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

impl RetrieveOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}
