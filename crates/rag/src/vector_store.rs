//! Semantic Index
//!
//! Dense vectors for every chunk, searched by exact cosine similarity. The
//! knowledge base is a single profile (tens to hundreds of chunks), so a
//! linear scan is exact and fast enough without an ANN structure.
//!
//! The index persists to `{dir}/semantic_index.json`. Writes go to a
//! temporary file that is then renamed over the old one, so a reader never
//! sees a half-written index. Loading from a directory with no persisted
//! index returns `Ok(None)`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use folio_core::{Chunk, Embedder};

use crate::embeddings::cosine_similarity;
use crate::RagError;

const INDEX_FILE: &str = "semantic_index.json";
const FORMAT_VERSION: u32 = 1;

/// Search hit: position in the index plus cosine similarity
#[derive(Debug, Clone, Copy)]
pub struct SemanticMatch {
    pub position: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Dense index over chunk embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndex {
    version: u32,
    embedder: String,
    dim: usize,
    entries: Vec<Entry>,
}

impl SemanticIndex {
    /// Embed every chunk and build the index
    pub async fn build(chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Self, RagError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let dim = embedder.dim();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(RagError::Embedding(format!(
                "Expected {}-dimensional vectors, got {}",
                dim,
                bad.len()
            )));
        }

        let entries = chunks
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, vector)| Entry { chunk, vector })
            .collect();

        Ok(Self {
            version: FORMAT_VERSION,
            embedder: embedder.name().to_string(),
            dim,
            entries,
        })
    }

    /// Top-k positions by cosine similarity, best first
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SemanticMatch>, RagError> {
        if query_vector.len() != self.dim {
            return Err(RagError::Search(format!(
                "Query vector has {} dimensions, index has {}",
                query_vector.len(),
                self.dim
            )));
        }

        let mut matches: Vec<SemanticMatch> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| SemanticMatch {
                position,
                score: cosine_similarity(query_vector, &entry.vector),
            })
            .collect();

        // Stable: equal scores keep insertion order
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    /// Chunk at a search position
    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.entries.get(position).map(|e| &e.chunk)
    }

    /// Indexed chunks in insertion order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_file(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Persist to `dir`, replacing any previous index atomically
    pub async fn persist(&self, dir: &Path) -> Result<(), RagError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| RagError::Persistence(format!("Failed to create {}: {}", dir.display(), e)))?;

        let bytes = serde_json::to_vec(self)
            .map_err(|e| RagError::Persistence(format!("Failed to serialize index: {}", e)))?;

        let target = Self::index_file(dir);
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| RagError::Persistence(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| RagError::Persistence(format!("Failed to replace {}: {}", target.display(), e)))?;

        tracing::info!(
            path = %target.display(),
            chunks = self.entries.len(),
            "Persisted semantic index"
        );
        Ok(())
    }

    /// Load a persisted index
    ///
    /// Returns `Ok(None)` when nothing is persisted, or when the persisted
    /// index was built by a different embedding function (its vectors are
    /// not comparable with new query vectors).
    pub async fn load(dir: &Path, embedder: &dyn Embedder) -> Result<Option<Self>, RagError> {
        let path = Self::index_file(dir);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No persisted semantic index");
                return Ok(None);
            },
            Err(e) => {
                return Err(RagError::Persistence(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            },
        };

        let index: SemanticIndex = serde_json::from_slice(&bytes)
            .map_err(|e| RagError::Persistence(format!("Corrupt index {}: {}", path.display(), e)))?;

        if index.version != FORMAT_VERSION
            || index.embedder != embedder.name()
            || index.dim != embedder.dim()
        {
            tracing::warn!(
                path = %path.display(),
                persisted = %index.embedder,
                configured = %embedder.name(),
                "Persisted semantic index does not match the embedder, ignoring it"
            );
            return Ok(None);
        }

        tracing::info!(
            path = %path.display(),
            chunks = index.entries.len(),
            "Loaded semantic index"
        );
        Ok(Some(index))
    }
}
