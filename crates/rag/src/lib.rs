//! RAG (Retrieval-Augmented Generation) with hybrid search
//!
//! Features:
//! - Recursive character chunking with overlap
//! - Knowledge loading from text, markdown, structured YAML/JSON and CV text
//! - Sparse BM25 search via Tantivy
//! - Dense search over a persisted in-process semantic index
//! - Embedders: offline feature hashing, Ollama, and FastEmbed (`fastembed` feature)
//! - Weighted reciprocal rank fusion with single-channel degradation
//! - Query classification, category expansion and lexical re-ranking
//! - Atomic index swap when documents are appended

pub mod chunker;
pub mod classifier;
pub mod embeddings;
#[cfg(feature = "fastembed")]
pub mod fastembed_embeddings;
pub mod index;
pub mod knowledge_loader;
pub mod ollama_embeddings;
pub mod query_expansion;
pub mod reranker;
pub mod retriever;
pub mod smart;
pub mod sparse_search;
pub mod vector_store;

pub use chunker::{ChunkConfig, TextSplitter};
pub use classifier::{QueryCategory, QueryClassifier};
pub use embeddings::{EmbeddingConfig, HashEmbedder};
#[cfg(feature = "fastembed")]
pub use fastembed_embeddings::FastEmbedEmbedder;
pub use index::{IndexSet, KnowledgeIndex};
pub use knowledge_loader::{KnowledgeDocument, KnowledgeFile, KnowledgeLoader};
pub use ollama_embeddings::{OllamaEmbedder, OllamaEmbeddingConfig};
pub use query_expansion::QueryExpander;
pub use reranker::LexicalScorer;
pub use retriever::{Bm25Channel, FusionWeights, HybridRetriever, KeywordChannel, RetrieverConfig};
pub use smart::SmartRetriever;
pub use sparse_search::{SparseConfig, SparseIndex, SparseResult};
pub use vector_store::{SemanticIndex, SemanticMatch};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Index not built: {0}")]
    IndexNotBuilt(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl From<RagError> for folio_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::IndexNotBuilt(what) => folio_core::Error::IndexNotBuilt(what),
            other => folio_core::Error::Rag(other.to_string()),
        }
    }
}
