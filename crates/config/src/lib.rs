//! Configuration management for the portfolio assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML/JSON files under `config/`
//! - Environment variables (`FOLIO__` prefix, `__` separator)
//! - Compiled defaults (see [`constants`])

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, EmbeddingProvider, EmbeddingSettings, LlmProviderKind, LlmSettings,
    ObservabilityConfig, RagConfig, RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
