//! Text Chunking
//!
//! Recursive character splitting: try the coarsest separator first
//! (paragraphs), fall back to lines, sentences, words and finally single
//! characters for pieces that are still too long. Adjacent pieces are merged
//! back up to `chunk_size` characters, carrying `chunk_overlap` characters of
//! trailing context into the next chunk.
//!
//! # Usage
//!
//! ```ignore
//! use folio_rag::chunker::{ChunkConfig, TextSplitter};
//!
//! let splitter = TextSplitter::new(ChunkConfig::default());
//! let chunks = splitter.split("Long document text...");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use folio_config::constants::rag;

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Separators tried in order; an empty separator splits into characters
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: rag::CHUNK_SIZE,
            chunk_overlap: rag::CHUNK_OVERLAP,
            separators: rag::SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }
}

impl From<&folio_config::RagConfig> for ChunkConfig {
    fn from(config: &folio_config::RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

/// Recursive character splitter
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkConfig,
}

impl TextSplitter {
    pub fn new(config: ChunkConfig) -> Self {
        // Overlap must leave room for new content in every chunk
        let mut config = config;
        config.chunk_size = config.chunk_size.max(1);
        if config.chunk_overlap >= config.chunk_size {
            config.chunk_overlap = config.chunk_size.saturating_sub(1);
        }
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split text into chunks of at most `chunk_size` characters
    pub fn split(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.config.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Pick the first separator present in the text; "" always matches
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }

        chunks
    }

    /// Merge small pieces up to `chunk_size`, keeping `chunk_overlap` of tail context
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };

            if total + len + joiner > size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window, separator) {
                    chunks.push(chunk);
                }

                // Drop from the front until only the overlap remains and the
                // next piece fits
                while total > overlap
                    || (total > 0 && total + len + if window.is_empty() { 0 } else { sep_len } > size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }

        if let Some(chunk) = join_trimmed(&window, separator) {
            chunks.push(chunk);
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join_trimmed(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
