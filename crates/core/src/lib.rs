//! Core traits and types for the portfolio assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Knowledge chunks and scored retrieval results
//! - Conversation turns and answers with cited sources
//! - Error taxonomy shared by retrieval and generation
//! - Seam traits for retrievers and embedding functions

pub mod answer;
pub mod chunk;
pub mod conversation;
pub mod error;
pub mod traits;

pub use answer::{Answer, Source};
pub use chunk::{Chunk, MatchSource, Metadata, ScoredChunk};
pub use conversation::{ConversationTurn, TurnRole};
pub use error::{Error, Result};
pub use traits::{Embedder, RetrieveOptions, Retriever};
