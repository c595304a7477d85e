//! Language model integration
//!
//! Features:
//! - Uniform backend interface over hosted OpenAI-compatible APIs (OpenAI,
//!   Groq) and local Ollama models
//! - Provider selection from settings, fixed at construction
//! - Grounding prompt template
//! - Sequential fallback chain with an explicit state machine

pub mod backend;
pub mod factory;
pub mod fallback;
pub mod prompt;

pub use backend::{
    FinishReason, GenerationResult, LlmBackend, LlmConfig, OllamaBackend, OpenAIBackend,
    OpenAIConfig,
};
pub use factory::LlmFactory;
pub use fallback::{ChainError, ChainOutcome, ChainState, FallbackChain};
pub use prompt::{Message, PromptTemplate, Role, NO_INFORMATION};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for folio_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(msg) => folio_core::Error::Config(msg),
            other => folio_core::Error::Llm(other.to_string()),
        }
    }
}
