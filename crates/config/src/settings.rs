//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{endpoints, llm, rag, server};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub rag: RagConfig,

    /// Answer generation configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_rag()?;
        self.validate_llm()?;
        self.validate_server()?;
        Ok(())
    }

    fn validate_rag(&self) -> Result<(), ConfigError> {
        let rag = &self.rag;

        if rag.chunk_size == 0 {
            return Err(invalid("rag.chunk_size", "Must be at least 1".to_string()));
        }

        if rag.chunk_overlap >= rag.chunk_size {
            return Err(invalid(
                "rag.chunk_overlap",
                format!(
                    "Must be smaller than chunk_size ({}), got {}",
                    rag.chunk_size, rag.chunk_overlap
                ),
            ));
        }

        if rag.semantic_weight < 0.0 || rag.keyword_weight < 0.0 {
            return Err(invalid(
                "rag.semantic_weight",
                format!(
                    "Weights must be non-negative, got {}/{}",
                    rag.semantic_weight, rag.keyword_weight
                ),
            ));
        }

        if rag.semantic_weight + rag.keyword_weight <= 0.0 {
            return Err(invalid(
                "rag.keyword_weight",
                "At least one fusion weight must be positive".to_string(),
            ));
        }

        if rag.rrf_k <= 0.0 {
            return Err(invalid("rag.rrf_k", format!("Must be positive, got {}", rag.rrf_k)));
        }

        if rag.semantic_top_k == 0 || rag.keyword_top_k == 0 || rag.final_top_k == 0 {
            return Err(invalid("rag.final_top_k", "Top-k values must be at least 1".to_string()));
        }

        if rag.embedding.dim == 0 {
            return Err(invalid("rag.embedding.dim", "Must be at least 1".to_string()));
        }

        if rag.final_top_k > rag.semantic_top_k + rag.keyword_top_k {
            tracing::debug!(
                "rag.final_top_k ({}) exceeds semantic_top_k + keyword_top_k ({}), \
                 results will be limited by retrieval",
                rag.final_top_k,
                rag.semantic_top_k + rag.keyword_top_k
            );
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "Model name cannot be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }

        if llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", "Must be at least 1".to_string()));
        }

        if llm.timeout_seconds == 0 {
            return Err(invalid("llm.timeout_seconds", "Must be at least 1".to_string()));
        }

        if llm.fallback_models.iter().any(|m| m.trim().is_empty()) {
            return Err(invalid(
                "llm.fallback_models",
                "Fallback model names cannot be empty".to_string(),
            ));
        }

        if self.environment.is_strict() && llm.temperature > 0.0 {
            tracing::warn!(
                temperature = llm.temperature,
                "Non-zero temperature: identical questions may get different answers"
            );
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "Port cannot be 0".to_string()));
        }

        if self.server.timeout_seconds == 0 {
            return Err(invalid("server.timeout_seconds", "Must be at least 1".to_string()));
        }

        if self.server.max_message_chars == 0 {
            return Err(invalid("server.max_message_chars", "Must be at least 1".to_string()));
        }

        if self.environment.is_production() && !self.server.cors_enabled {
            return Err(invalid(
                "server.cors_enabled",
                "CORS must be enabled in production".to_string(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_server_timeout")]
    pub timeout_seconds: u64,

    /// Longest accepted chat message, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    server::PORT
}
fn default_server_timeout() -> u64 {
    60
}
fn default_max_message_chars() -> usize {
    server::MAX_MESSAGE_CHARS
}
fn default_true() -> bool {
    true
}
fn default_cors_origins() -> Vec<String> {
    server::CORS_ORIGINS.iter().map(|s| s.to_string()).collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_server_timeout(),
            max_message_chars: default_max_message_chars(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Directory scanned for knowledge files at startup
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: String,

    /// Directory holding the persisted semantic index
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Candidates requested from the semantic index
    #[serde(default = "default_sub_top_k")]
    pub semantic_top_k: usize,

    /// Candidates requested from the keyword index
    #[serde(default = "default_sub_top_k")]
    pub keyword_top_k: usize,

    /// Final evidence set size
    #[serde(default = "default_final_top_k")]
    pub final_top_k: usize,

    /// Fusion weight of the semantic channel
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Fusion weight of the keyword channel
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Rank fusion smoothing constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

fn default_knowledge_dir() -> String {
    "./data".to_string()
}
fn default_index_path() -> String {
    "./vector_store".to_string()
}
fn default_chunk_size() -> usize {
    rag::CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    rag::CHUNK_OVERLAP
}
fn default_sub_top_k() -> usize {
    rag::TOP_K_RESULTS
}
fn default_final_top_k() -> usize {
    rag::SMART_TOP_K
}
fn default_semantic_weight() -> f32 {
    rag::SEMANTIC_WEIGHT
}
fn default_keyword_weight() -> f32 {
    rag::KEYWORD_WEIGHT
}
fn default_rrf_k() -> f32 {
    rag::RRF_K
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            knowledge_dir: default_knowledge_dir(),
            index_path: default_index_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            semantic_top_k: default_sub_top_k(),
            keyword_top_k: default_sub_top_k(),
            final_top_k: default_final_top_k(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            rrf_k: default_rrf_k(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

/// Embedding function selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature-hashing embedder
    #[default]
    Hash,
    /// Ollama `/api/embed`
    Ollama,
    /// Local ONNX sentence model; needs the `fastembed` build feature
    FastEmbed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dim")]
    pub dim: usize,
}

fn default_ollama_endpoint() -> String {
    endpoints::OLLAMA.to_string()
}
fn default_embedding_model() -> String {
    "all-minilm".to_string()
}
fn default_embedding_dim() -> usize {
    rag::EMBEDDING_DIM
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            endpoint: default_ollama_endpoint(),
            model: default_embedding_model(),
            dim: default_embedding_dim(),
        }
    }
}

/// Model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// OpenAI hosted models
    #[default]
    OpenAI,
    /// Groq (OpenAI-compatible, free tier)
    Groq,
    /// Local Ollama
    Ollama,
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Hosted provider used when `use_free_model` is off
    #[serde(default)]
    pub provider: LlmProviderKind,

    /// Primary hosted model
    #[serde(default = "default_model")]
    pub model: String,

    /// Use a free model (Groq or local Ollama) as the primary
    #[serde(default)]
    pub use_free_model: bool,

    /// Free model flavour: groq or ollama
    #[serde(default = "default_free_model_type")]
    pub free_model_type: LlmProviderKind,

    /// Override for the hosted provider's API base
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub groq_api_key: Option<String>,

    /// Ollama endpoint for the local free model
    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,

    /// Ordered fallback models on the hosted provider
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,

    /// Retries for transient network failures within one backend
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Person the knowledge base describes, used in the prompt
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_model() -> String {
    llm::DEFAULT_MODEL.to_string()
}
fn default_free_model_type() -> LlmProviderKind {
    LlmProviderKind::Groq
}
fn default_fallback_models() -> Vec<String> {
    llm::FALLBACK_MODELS.iter().map(|s| s.to_string()).collect()
}
fn default_temperature() -> f32 {
    llm::TEMPERATURE
}
fn default_max_tokens() -> usize {
    llm::MAX_TOKENS
}
fn default_llm_timeout() -> u64 {
    llm::TIMEOUT_SECS
}
fn default_max_retries() -> u32 {
    2
}
fn default_subject() -> String {
    "the portfolio owner".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            model: default_model(),
            use_free_model: false,
            free_model_type: default_free_model_type(),
            endpoint: None,
            api_key: None,
            groq_api_key: None,
            ollama_endpoint: default_ollama_endpoint(),
            fallback_models: default_fallback_models(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_llm_timeout(),
            max_retries: default_max_retries(),
            subject: default_subject(),
        }
    }
}

impl LlmSettings {
    /// API key for the hosted provider, falling back to the provider's
    /// conventional environment variable
    pub fn hosted_api_key(&self) -> Option<String> {
        let env_var = match self.provider {
            LlmProviderKind::OpenAI => "OPENAI_API_KEY",
            LlmProviderKind::Groq => "GROQ_API_KEY",
            LlmProviderKind::Ollama => return None,
        };
        non_empty(self.api_key.clone()).or_else(|| non_empty(std::env::var(env_var).ok()))
    }

    /// Groq key for the free model, falling back to `GROQ_API_KEY`
    pub fn groq_key(&self) -> Option<String> {
        non_empty(self.groq_api_key.clone())
            .or_else(|| non_empty(std::env::var("GROQ_API_KEY").ok()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (FOLIO__ prefix, e.g. `FOLIO__LLM__MODEL`)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("FOLIO")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("server.cors_origins")
            .with_list_parse_key("llm.fallback_models")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.rag.chunk_size, 500);
        assert_eq!(settings.rag.chunk_overlap, 50);
        assert_eq!(settings.rag.semantic_weight, 0.7);
        assert_eq!(settings.rag.keyword_weight, 0.3);
        assert_eq!(settings.llm.max_tokens, 500);
        assert_eq!(
            settings.llm.fallback_models,
            vec!["gpt-3.5-turbo".to_string(), "gpt-3.5-turbo-16k".to_string()]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rag_validation_weights() {
        let mut settings = Settings::default();

        settings.rag.semantic_weight = -0.1;
        assert!(settings.validate_rag().is_err());

        settings.rag.semantic_weight = 0.0;
        settings.rag.keyword_weight = 0.0;
        assert!(settings.validate_rag().is_err());

        settings.rag.keyword_weight = 1.0;
        assert!(settings.validate_rag().is_ok());
    }

    #[test]
    fn test_rag_validation_chunking() {
        let mut settings = Settings::default();

        settings.rag.chunk_overlap = 500;
        assert!(settings.validate_rag().is_err());

        settings.rag.chunk_overlap = 50;
        settings.rag.chunk_size = 0;
        assert!(settings.validate_rag().is_err());
    }

    #[test]
    fn test_rag_validation_top_k() {
        let mut settings = Settings::default();
        settings.rag.final_top_k = 0;
        assert!(settings.validate_rag().is_err());

        settings.rag.final_top_k = 10;
        settings.rag.rrf_k = 0.0;
        assert!(settings.validate_rag().is_err());
    }

    #[test]
    fn test_llm_validation() {
        let mut settings = Settings::default();

        settings.llm.temperature = 2.5;
        assert!(settings.validate_llm().is_err());
        settings.llm.temperature = 0.2;

        settings.llm.model = "  ".to_string();
        assert!(settings.validate_llm().is_err());
        settings.llm.model = "gpt-4".to_string();

        settings.llm.fallback_models.push(String::new());
        assert!(settings.validate_llm().is_err());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();

        settings.server.port = 0;
        assert!(settings.validate_server().is_err());
        settings.server.port = 8000;

        settings.environment = RuntimeEnvironment::Production;
        settings.server.cors_enabled = false;
        assert!(settings.validate_server().is_err());

        settings.server.cors_enabled = true;
        assert!(settings.validate_server().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
llm:
  use_free_model: true
  free_model_type: ollama
rag:
  semantic_weight: 0.5
  keyword_weight: 0.5
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert!(settings.llm.use_free_model);
        assert_eq!(settings.llm.free_model_type, LlmProviderKind::Ollama);
        assert_eq!(settings.rag.semantic_weight, 0.5);
        assert_eq!(settings.rag.chunk_size, 500);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let settings = LlmSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.hosted_api_key(), Some("sk-test".to_string()));

        let local = LlmSettings {
            provider: LlmProviderKind::Ollama,
            api_key: Some("ignored".to_string()),
            ..Default::default()
        };
        assert_eq!(local.hosted_api_key(), None);
    }
}
