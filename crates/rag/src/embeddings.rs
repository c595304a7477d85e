//! Text Embeddings
//!
//! Feature-hashing embedder: lowercased unicode words and character
//! trigrams are hashed (FNV-1a) into a fixed number of buckets and the
//! resulting vector is L2-normalized. It needs no model files or network,
//! which makes it the default for local runs and tests. Semantic quality is
//! lexical-ish; configure the Ollama embedder for real sentence embeddings.

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use folio_config::constants::rag;
use folio_core::{Embedder, Result};

/// Weight of a whole-word feature relative to a trigram feature
const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Embedding configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Embedding dimension
    pub embedding_dim: usize,
    /// Normalize embeddings
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: rag::EMBEDDING_DIM,
            normalize: true,
        }
    }
}

/// Deterministic hashing embedder (no model required)
pub struct HashEmbedder {
    config: EmbeddingConfig,
    name: String,
}

impl HashEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        let config = EmbeddingConfig {
            embedding_dim: config.embedding_dim.max(1),
            ..config
        };
        let name = format!("hash-{}", config.embedding_dim);
        Self { config, name }
    }

    /// Generate the embedding synchronously
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let dim = self.config.embedding_dim;
        let mut embedding = vec![0.0f32; dim];
        let lowered = text.to_lowercase();

        for word in lowered.unicode_words() {
            embedding[bucket(word.as_bytes(), dim)] += WORD_WEIGHT;

            let chars: Vec<char> = word.chars().collect();
            if chars.len() < 3 {
                continue;
            }
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[bucket(trigram.as_bytes(), dim)] += TRIGRAM_WEIGHT;
            }
        }

        if self.config.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut embedding {
                    *v /= norm;
                }
            }
        }

        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EmbeddingConfig::default())
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dim(&self) -> usize {
        self.config.embedding_dim
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// FNV-1a bucket
fn bucket(bytes: &[u8], dim: usize) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % dim as u64) as usize
}

/// Cosine similarity of two vectors (0.0 when either is zero or lengths differ)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder() {
        let embedder = HashEmbedder::default();
        let embedding = embedder.embed_sync("Hello world");

        assert_eq!(embedding.len(), 384);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.embed_sync("Rust, Python"), embedder.embed_sync("Rust, Python"));
    }

    #[test]
    fn test_related_text_is_closer() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_sync("python programming skills");
        let related = embedder.embed_sync("Skills: Python, Rust, programming in SQL");
        let unrelated = embedder.embed_sync("Graduated with a degree in history");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::default();
        assert!(embedder.embed_sync("").iter().all(|v| *v == 0.0));
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_trait_batch() {
        let embedder = HashEmbedder::new(EmbeddingConfig {
            embedding_dim: 16,
            normalize: true,
        });
        let vectors = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 16));
        assert_eq!(embedder.name(), "hash-16");
    }
}
