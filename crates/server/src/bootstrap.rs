//! Startup wiring
//!
//! Construction-time faults abort startup: an unusable model configuration
//! or an empty knowledge base never reaches the first request.

use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;

use folio_agent::{AnswerGenerator, AnswerGeneratorConfig};
use folio_config::{EmbeddingProvider, EmbeddingSettings, RagConfig, Settings};
use folio_core::Embedder;
use folio_llm::{LlmFactory, PromptTemplate};
use folio_rag::{
    ChunkConfig, EmbeddingConfig, HashEmbedder, HybridRetriever, KnowledgeIndex, KnowledgeLoader,
    OllamaEmbedder, OllamaEmbeddingConfig, RagError, RetrieverConfig, SmartRetriever, TextSplitter,
};

use crate::state::AppState;
use crate::ServerError;

/// Create the configured embedding function
pub async fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, ServerError> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(EmbeddingConfig {
            embedding_dim: settings.dim,
            normalize: true,
        })),
        EmbeddingProvider::Ollama => Arc::new(
            OllamaEmbedder::new(OllamaEmbeddingConfig::from(settings))
                .map_err(|e| ServerError::Startup(e.to_string()))?,
        ),
        EmbeddingProvider::FastEmbed => fastembed_embedder(settings).await?,
    };

    tracing::info!(embedder = embedder.name(), dim = embedder.dim(), "Initialized embedder");
    Ok(embedder)
}

#[cfg(feature = "fastembed")]
async fn fastembed_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, ServerError> {
    let embedder = folio_rag::FastEmbedEmbedder::new(&settings.model)
        .await
        .map_err(|e| ServerError::Startup(e.to_string()))?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "fastembed"))]
async fn fastembed_embedder(_settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, ServerError> {
    Err(ServerError::Startup(
        "embedding provider 'fastembed' requires building with the `fastembed` feature".to_string(),
    ))
}

/// Load the persisted index, or build it from the knowledge directory
pub async fn load_index(
    rag: &RagConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<KnowledgeIndex>, ServerError> {
    let index = Arc::new(KnowledgeIndex::new(
        embedder,
        Some(PathBuf::from(&rag.index_path)),
    ));

    let loader = KnowledgeLoader::new(TextSplitter::new(ChunkConfig::from(rag)));
    let knowledge_dir = PathBuf::from(&rag.knowledge_dir);

    let loaded = index
        .load_or_build(|| {
            let chunks = loader.load_directory(&knowledge_dir)?;
            if chunks.is_empty() {
                return Err(RagError::Loader(format!(
                    "No knowledge documents found in {}",
                    knowledge_dir.display()
                )));
            }
            Ok(chunks)
        })
        .await
        .map_err(|e| ServerError::Startup(e.to_string()))?;

    if index.document_count() == 0 {
        return Err(ServerError::Startup(format!(
            "Knowledge index at {} is empty",
            rag.index_path
        )));
    }

    tracing::info!(
        loaded,
        documents = index.document_count(),
        index_path = %rag.index_path,
        "Knowledge index ready"
    );
    Ok(index)
}

/// Build the full application state from settings
pub async fn build_state(
    settings: Settings,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, ServerError> {
    let chain = LlmFactory::chain(&settings.llm).map_err(|e| ServerError::Startup(e.to_string()))?;

    let embedder = build_embedder(&settings.rag.embedding).await?;
    let index = load_index(&settings.rag, embedder).await?;

    let hybrid = Arc::new(
        HybridRetriever::new(index.clone(), RetrieverConfig::from(&settings.rag))
            .map_err(|e| ServerError::Startup(e.to_string()))?,
    );
    let smart = SmartRetriever::new(hybrid.clone());

    let generator = AnswerGenerator::new(
        Arc::new(smart),
        chain,
        PromptTemplate::new(settings.llm.subject.clone()),
    )
    .with_config(AnswerGeneratorConfig::from(&settings.rag));

    Ok(AppState::new(settings, index, hybrid, Arc::new(generator)).with_metrics(metrics))
}
