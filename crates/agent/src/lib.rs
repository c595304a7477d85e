//! Grounded answering over the portfolio knowledge base
//!
//! Features:
//! - Conversation memory, resynchronized from the caller's history
//! - Answer generator: retrieval, grounding prompt, model fallback chain

pub mod chain;
pub mod memory;

pub use chain::{AnswerGenerator, AnswerGeneratorConfig};
pub use memory::ConversationMemory;
