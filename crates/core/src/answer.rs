//! Answer types produced by the answer generator

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chunk::{Metadata, ScoredChunk};

/// A cited evidence snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

impl From<&ScoredChunk> for Source {
    fn from(scored: &ScoredChunk) -> Self {
        Self {
            content: scored.chunk.text.clone(),
            metadata: scored.chunk.metadata.clone(),
            relevance_score: Some(scored.score),
        }
    }
}

/// Grounded answer
#[derive(Debug, Clone)]
pub struct Answer {
    /// Generated answer text
    pub text: String,
    /// Evidence chunks in ranked order
    pub sources: Vec<Source>,
    /// Identifier of the model that actually produced the text
    pub model_used: String,
    /// Wall-clock time spent answering
    pub elapsed: Duration,
}

impl Answer {
    /// Elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
