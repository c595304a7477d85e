//! Error types shared across the workspace

use thiserror::Error;

/// Result alias using the core error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// One retrieval channel failed; recovered locally and never surfaced to callers
    #[error("Retrieval degraded ({channel}): {message}")]
    RetrievalDegraded { channel: String, message: String },

    /// Every configured model failed; carries the primary model's error
    #[error("Model unavailable: {model} failed after {attempts} attempt(s): {message}")]
    ModelUnavailable {
        model: String,
        attempts: usize,
        message: String,
    },

    /// Retrieval produced no evidence
    #[error("No knowledge found for query")]
    NoKnowledgeFound,

    /// Index used before it was constructed
    #[error("Index not built: {0}")]
    IndexNotBuilt(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Caller-usage errors that must abort rather than degrade
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::IndexNotBuilt(_) | Error::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_unavailable_display() {
        let err = Error::ModelUnavailable {
            model: "gpt-3.5-turbo".to_string(),
            attempts: 3,
            message: "HTTP 429".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("gpt-3.5-turbo"));
        assert!(text.contains("3 attempt"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::IndexNotBuilt("semantic".into()).is_fatal());
        assert!(!Error::NoKnowledgeFound.is_fatal());
        assert!(!Error::Rag("x".into()).is_fatal());
    }
}
