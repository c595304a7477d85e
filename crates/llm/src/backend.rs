//! LLM Backend implementations
//!
//! Every model is reached through [`LlmBackend`], so the answer generator
//! never branches on backend identity:
//!
//! - [`OpenAIBackend`]: any OpenAI-compatible `/chat/completions` API
//!   (OpenAI, Groq, local vLLM-style servers)
//! - [`OllamaBackend`]: local models through Ollama's `/api/chat`, with
//!   retry and exponential backoff for transient failures

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use folio_config::constants::{endpoints, llm};

use crate::prompt::Message;
use crate::LlmError;

/// Ollama configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
    /// How long Ollama keeps the model loaded between calls
    pub keep_alive: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: llm::OLLAMA_MODEL.to_string(),
            endpoint: endpoints::OLLAMA.to_string(),
            max_tokens: llm::MAX_TOKENS,
            temperature: llm::TEMPERATURE,
            timeout: Duration::from_secs(llm::TIMEOUT_SECS),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            keep_alive: "5m".to_string(),
        }
    }
}

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Generated text
    pub text: String,
    /// Tokens generated (0 when the backend does not report usage)
    pub tokens: usize,
    /// Total generation time (ms)
    pub total_time_ms: u64,
    /// Finish reason
    pub finish_reason: FinishReason,
}

/// Finish reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a response
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError>;

    /// Check if model is available
    async fn is_available(&self) -> bool;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Execute a single request (used by retry logic)
    async fn execute_request(
        &self,
        request: &OllamaChatRequest,
    ) -> Result<OllamaChatResponse, LlmError> {
        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            // 5xx errors are retryable, 4xx are not
            if status.is_server_error() {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(LlmError::ModelNotFound(self.config.model.clone()));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &LlmError) -> bool {
        matches!(error, LlmError::Network(_) | LlmError::Timeout)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();

        let request = OllamaChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(|m| m.into()).collect(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(self.config.temperature),
                num_predict: Some(self.config.max_tokens as i32),
            }),
            keep_alive: Some(self.config.keep_alive.clone()),
        };

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    model = %self.config.model,
                    ?backoff,
                    attempt,
                    max_retries = self.config.max_retries,
                    "Ollama request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&request).await {
                Ok(result) => {
                    return Ok(GenerationResult {
                        text: result.message.content,
                        tokens: result.eval_count.unwrap_or(0) as usize,
                        total_time_ms: start.elapsed().as_millis() as u64,
                        finish_reason: match result.done_reason.as_deref() {
                            Some("length") => FinishReason::Length,
                            _ => FinishReason::Stop,
                        },
                    });
                },
                Err(e) if Self::is_retryable(&e) => {
                    last_error = Some(e);
                },
                Err(e) => {
                    return Err(e);
                },
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    eval_count: Option<u64>,
}

// =============================================================================
// OpenAI-compatible Backend
// =============================================================================

/// Configuration for OpenAI-compatible backends
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API base (OpenAI: https://api.openai.com/v1)
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Temperature (0-2)
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Organization ID (OpenAI specific)
    pub organization: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::OPENAI.to_string(),
            api_key: String::new(),
            model: llm::DEFAULT_MODEL.to_string(),
            max_tokens: llm::MAX_TOKENS,
            temperature: llm::TEMPERATURE,
            timeout: Duration::from_secs(llm::TIMEOUT_SECS),
            organization: None,
        }
    }
}

impl OpenAIConfig {
    /// Create config for OpenAI
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Create config for Groq's OpenAI-compatible API
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoints::GROQ.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Create config for a local OpenAI-compatible server
    pub fn local(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: "not-needed".to_string(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible backend
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    /// Create new OpenAI backend
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        let is_local = config.endpoint.starts_with("http://localhost")
            || config.endpoint.starts_with("http://127.0.0.1");
        if config.api_key.is_empty() && !is_local {
            return Err(LlmError::Configuration(format!(
                "API key required for {} ({})",
                config.model, config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::HeaderValue;

        let mut headers = reqwest::header::HeaderMap::new();

        let auth_value = format!("Bearer {}", self.config.api_key);
        if let Ok(val) = HeaderValue::from_str(&auth_value) {
            headers.insert(reqwest::header::AUTHORIZATION, val);
        }

        if let Some(ref org) = self.config.organization {
            if let Ok(val) = HeaderValue::from_str(org) {
                headers.insert("OpenAI-Organization", val);
            }
        }

        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        headers
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();

        let request = OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            stream: Some(false),
        };

        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(LlmError::ModelNotFound(format!(
                    "{}: {}",
                    self.config.model, error_text
                )));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse("Empty completion".to_string()));
        }

        Ok(GenerationResult {
            text,
            tokens: response.usage.map(|u| u.completion_tokens).unwrap_or(0),
            total_time_ms: start.elapsed().as_millis() as u64,
            finish_reason: match choice.finish_reason.as_deref() {
                Some("length") => FinishReason::Length,
                _ => FinishReason::Stop,
            },
        })
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.config.endpoint.trim_end_matches('/'));
        self.client
            .get(&url)
            .headers(self.build_headers())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Role;

    #[test]
    fn test_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.keep_alive, "5m");
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message {
            role: Role::User,
            content: "Hello".to_string(),
        };
        let ollama_msg: OllamaMessage = (&msg).into();
        assert_eq!(ollama_msg.role, "user");
        assert_eq!(ollama_msg.content, "Hello");
    }

    #[test]
    fn test_ollama_request_serialization() {
        let request = OllamaChatRequest {
            model: "test".to_string(),
            messages: vec![],
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(0.0),
                num_predict: Some(500),
            }),
            keep_alive: Some("5m".to_string()),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("keep_alive"));
        assert!(json.contains("num_predict"));
    }

    #[test]
    fn test_ollama_response_parsing() {
        let json = r#"{"model":"llama3:8b","message":{"role":"assistant","content":"Hi"},"done":true,"done_reason":"stop","eval_count":3}"#;
        let response: OllamaChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.message.content, "Hi");
        assert_eq!(response.eval_count, Some(3));
    }

    #[tokio::test]
    async fn test_ollama_unreachable_retries_then_fails() {
        let backend = OllamaBackend::new(LlmConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap();

        let err = backend.generate(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_) | LlmError::Timeout));
        assert!(!backend.is_available().await);
    }

    #[test]
    fn test_openai_config_presets() {
        let config = OpenAIConfig::openai("sk-xxx", "gpt-4");
        assert_eq!(config.endpoint, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4");

        let config = OpenAIConfig::groq("gsk-xxx", "llama3-8b-8192");
        assert_eq!(config.endpoint, "https://api.groq.com/openai/v1");

        let config = OpenAIConfig::local("http://localhost:8000/v1", "llama-3");
        assert_eq!(config.api_key, "not-needed");
    }

    #[test]
    fn test_openai_backend_creation() {
        // Local endpoint should work without API key
        let config = OpenAIConfig::local("http://localhost:8000", "test");
        assert!(OpenAIBackend::new(config).is_ok());

        // Remote endpoint requires API key
        let config = OpenAIConfig::default();
        assert!(matches!(
            OpenAIBackend::new(config),
            Err(LlmError::Configuration(_))
        ));

        let config = OpenAIConfig::openai("sk-xxx", "gpt-4");
        assert!(OpenAIBackend::new(config).is_ok());
    }

    #[test]
    fn test_openai_chat_url() {
        let config = OpenAIConfig::groq("gsk", "llama3-8b-8192");
        let backend = OpenAIBackend::new(config).unwrap();
        assert_eq!(
            backend.chat_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_openai_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"foo@example.com"},"finish_reason":"stop"}],"usage":{"completion_tokens":4,"prompt_tokens":10,"total_tokens":14}}"#;
        let response: OpenAIChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("foo@example.com")
        );
        assert_eq!(response.usage.unwrap().completion_tokens, 4);
    }
}
