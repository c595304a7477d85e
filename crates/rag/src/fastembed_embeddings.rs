//! FastEmbed Embeddings
//!
//! Local ONNX sentence embeddings (all-MiniLM-L6-v2 by default) through the
//! `fastembed` crate. Model files are fetched from the Hugging Face hub on
//! first use and cached. Inference is CPU-bound and runs on blocking threads.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, ModelTrait, TextEmbedding, TextInitOptions};
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::Arc;

use folio_core::{Embedder, Result};

use crate::RagError;

/// FastEmbed sentence embedder
pub struct FastEmbedEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    dim: usize,
    name: String,
}

impl FastEmbedEmbedder {
    /// Load a model by fastembed model code
    ///
    /// Codes fastembed does not recognise (e.g. Ollama's `all-minilm`) fall
    /// back to all-MiniLM-L6-v2.
    pub async fn new(model_code: &str) -> std::result::Result<Self, RagError> {
        let model_name = resolve_model(model_code);
        let info = EmbeddingModel::get_model_info(&model_name).ok_or_else(|| {
            RagError::Configuration(format!("No FastEmbed metadata for {}", model_name))
        })?;
        let dim = info.dim;
        let name = format!("fastembed:{}", info.model_code);

        let options = TextInitOptions::new(model_name).with_show_download_progress(false);
        let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
            .await
            .map_err(|e| RagError::Embedding(format!("FastEmbed init task failed: {}", e)))?
            .map_err(|e| RagError::Embedding(format!("Failed to load FastEmbed model: {}", e)))?;

        tracing::info!(model = %name, dim, "Loaded FastEmbed model");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dim,
            name,
        })
    }

    async fn embed_many(&self, texts: Vec<String>) -> std::result::Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let model = self.model.clone();
        let vectors = tokio::task::spawn_blocking(move || model.lock().embed(texts, None))
            .await
            .map_err(|e| RagError::Embedding(format!("FastEmbed task failed: {}", e)))?
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if vectors.len() != expected {
            return Err(RagError::Embedding(format!(
                "FastEmbed returned {} vectors for {} inputs",
                vectors.len(),
                expected
            )));
        }
        Ok(vectors)
    }
}

fn resolve_model(code: &str) -> EmbeddingModel {
    EmbeddingModel::from_str(code).unwrap_or_else(|_| {
        tracing::debug!(code, "Unknown FastEmbed model code, using all-MiniLM-L6-v2");
        EmbeddingModel::AllMiniLML6V2
    })
}

#[async_trait]
impl Embedder for FastEmbedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_many(vec![text.to_string()]).await?;
        Ok(vectors
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.embed_many(texts.to_vec()).await?)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_code_falls_back_to_minilm() {
        assert_eq!(resolve_model("all-minilm"), EmbeddingModel::AllMiniLML6V2);
    }

    #[test]
    fn test_minilm_is_384_dimensional() {
        let info = EmbeddingModel::get_model_info(&EmbeddingModel::AllMiniLML6V2).unwrap();
        assert_eq!(info.dim, 384);
    }
}
