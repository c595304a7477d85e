//! Application State
//!
//! Shared state across all handlers. Everything is built once at startup
//! and injected here; handlers never reach for globals.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use folio_agent::AnswerGenerator;
use folio_config::Settings;
use folio_rag::{ChunkConfig, HybridRetriever, KnowledgeIndex, TextSplitter};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Document store and both indexes, swapped atomically on append
    pub index: Arc<KnowledgeIndex>,
    /// Kept for fusion weight updates
    pub retriever: Arc<HybridRetriever>,
    pub generator: Arc<AnswerGenerator>,
    /// Splits documents posted to the admin endpoint
    pub splitter: Arc<TextSplitter>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Settings,
        index: Arc<KnowledgeIndex>,
        retriever: Arc<HybridRetriever>,
        generator: Arc<AnswerGenerator>,
    ) -> Self {
        let splitter = TextSplitter::new(ChunkConfig::from(&config.rag));
        Self {
            config: Arc::new(config),
            index,
            retriever,
            generator,
            splitter: Arc::new(splitter),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// Person the knowledge base describes
    pub fn subject(&self) -> &str {
        &self.config.llm.subject
    }
}
