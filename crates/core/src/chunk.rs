//! Knowledge chunks
//!
//! A chunk is the atomic unit of retrieval: a bounded span of source text
//! plus metadata (`source`, `section`, `type`, `category`). Chunks are created
//! once at load time and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chunk metadata (string keys, string or numeric values)
pub type Metadata = HashMap<String, serde_json::Value>;

/// Immutable unit of knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier shared by every index built over this chunk
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Chunk metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    /// Create a chunk with a fresh identifier
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), text)
    }

    /// Create a chunk with an explicit identifier
    pub fn with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add metadata
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata value rendered as a string (numbers are formatted)
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Check whether a metadata key holds the expected value
    pub fn metadata_matches(&self, key: &str, expected: &str) -> bool {
        self.metadata_str(key).as_deref() == Some(expected)
    }
}

/// Which retrieval channel produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Semantic,
    Keyword,
    Hybrid,
}

/// A chunk paired with its relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub source: MatchSource,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32, source: MatchSource) -> Self {
        Self {
            chunk,
            score,
            source,
        }
    }
}
