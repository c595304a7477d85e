//! Core traits for the portfolio assistant
//!
//! Components depend on these seams rather than on concrete types:
//!
//! ```text
//! Retrieval:
//!   - Retriever: query → ordered evidence chunks
//!
//! Embeddings:
//!   - Embedder: text → fixed-length dense vector
//! ```

mod embedder;
mod retriever;

pub use embedder::Embedder;
pub use retriever::{RetrieveOptions, Retriever};
