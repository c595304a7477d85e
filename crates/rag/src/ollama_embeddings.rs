//! Ollama Embeddings
//!
//! Uses Ollama's embedding API (`POST {endpoint}/api/embed`) for dense
//! vectors. Documents and queries are embedded the same way.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use folio_config::EmbeddingSettings;
use folio_core::{Embedder, Result};

use crate::RagError;

/// Ollama embedding configuration
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingConfig {
    /// Ollama API endpoint
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Embedding dimension
    pub embedding_dim: usize,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: folio_config::constants::endpoints::OLLAMA.to_string(),
            model: "all-minilm".to_string(),
            embedding_dim: folio_config::constants::rag::EMBEDDING_DIM,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&EmbeddingSettings> for OllamaEmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            embedding_dim: settings.dim,
            ..Default::default()
        }
    }
}

/// Request to Ollama embedding API
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response from Ollama embedding API
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama embedder
pub struct OllamaEmbedder {
    client: Client,
    config: OllamaEmbeddingConfig,
    name: String,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: OllamaEmbeddingConfig) -> std::result::Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        let name = format!("ollama:{}", config.model);

        Ok(Self {
            client,
            config,
            name,
        })
    }

    /// Get model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn embed_raw(&self, text: &str) -> std::result::Result<Vec<f32>, RagError> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: text,
        };

        let url = format!("{}/api/embed", self.config.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Ollama embedding failed: {} - {}",
                status, text
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        let embedding = embed_response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))?;

        if embedding.len() != self.config.embedding_dim {
            return Err(RagError::Embedding(format!(
                "Expected {}-dimensional embedding from {}, got {}",
                self.config.embedding_dim,
                self.config.model,
                embedding.len()
            )));
        }

        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_raw(text).await?)
    }

    fn dim(&self) -> usize {
        self.config.embedding_dim
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OllamaEmbeddingConfig::default();
        assert_eq!(config.model, "all-minilm");
        assert_eq!(config.embedding_dim, 384);
    }

    #[test]
    fn test_from_settings_trims_endpoint() {
        let settings = EmbeddingSettings {
            endpoint: "http://ollama:11434/".to_string(),
            ..Default::default()
        };
        let config = OllamaEmbeddingConfig::from(&settings);
        assert_eq!(config.endpoint, "http://ollama:11434");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        let embedder = OllamaEmbedder::new(OllamaEmbeddingConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap();

        assert!(embedder.embed("hello").await.is_err());
        assert_eq!(embedder.name(), "ollama:all-minilm");
    }
}
