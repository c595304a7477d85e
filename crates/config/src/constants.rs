//! Centralized constants for the portfolio assistant
//!
//! Single source of truth for default values shared by settings, the
//! retrieval stack and the answer generator.

/// Retrieval defaults
pub mod rag {
    /// Maximum chunk size in characters
    pub const CHUNK_SIZE: usize = 500;

    /// Overlap between consecutive chunks in characters
    pub const CHUNK_OVERLAP: usize = 50;

    /// Fusion weight for the semantic index
    pub const SEMANTIC_WEIGHT: f32 = 0.7;

    /// Fusion weight for the keyword index
    pub const KEYWORD_WEIGHT: f32 = 0.3;

    /// Rank fusion smoothing constant
    pub const RRF_K: f32 = 60.0;

    /// Candidates requested from each sub-retriever
    pub const TOP_K_RESULTS: usize = 3;

    /// Final evidence set size returned by the smart retriever
    pub const SMART_TOP_K: usize = 10;

    /// Default dimension of the offline hashing embedder
    pub const EMBEDDING_DIM: usize = 384;

    /// Separators tried in order when splitting text
    pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];
}

/// Generation defaults
pub mod llm {
    /// Sampling temperature; zero keeps answers repeatable
    pub const TEMPERATURE: f32 = 0.0;

    /// Maximum tokens in a generated answer
    pub const MAX_TOKENS: usize = 500;

    /// Hosted primary model
    pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

    /// Hosted fallback models, tried in order
    pub const FALLBACK_MODELS: [&str; 2] = ["gpt-3.5-turbo", "gpt-3.5-turbo-16k"];

    /// Free hosted model on Groq
    pub const GROQ_MODEL: &str = "llama3-8b-8192";

    /// Free local model on Ollama
    pub const OLLAMA_MODEL: &str = "llama3:8b";

    /// Request timeout in seconds
    pub const TIMEOUT_SECS: u64 = 30;
}

/// Service endpoints
pub mod endpoints {
    /// OpenAI API base
    pub const OPENAI: &str = "https://api.openai.com/v1";

    /// Groq OpenAI-compatible API base
    pub const GROQ: &str = "https://api.groq.com/openai/v1";

    /// Local Ollama endpoint
    pub const OLLAMA: &str = "http://localhost:11434";
}

/// HTTP surface defaults
pub mod server {
    pub const PORT: u16 = 8000;

    /// Longest accepted chat message, in characters
    pub const MAX_MESSAGE_CHARS: usize = 1000;

    pub const CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];
}
