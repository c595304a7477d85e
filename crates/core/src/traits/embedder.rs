//! Embedding function trait

use async_trait::async_trait;

use crate::Result;

/// Embedding function used opaquely by the semantic index
///
/// Implementations must return vectors of length `dim()` for every input.
#[async_trait]
pub trait Embedder: Send + Sync + 'static {
    /// Embed a document chunk
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a search query
    ///
    /// Defaults to the document embedding; instruction-tuned models may override.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(query).await
    }

    /// Embed several documents
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Vector dimension
    fn dim(&self) -> usize;

    /// Identifier persisted alongside vectors, so a reload with a different
    /// embedding function can be detected
    fn name(&self) -> &str;
}
