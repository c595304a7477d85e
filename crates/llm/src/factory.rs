//! LLM Factory - Provider Selection
//!
//! Builds backends from [`LlmSettings`]. Provider choice happens once, at
//! construction; callers only ever see `Arc<dyn LlmBackend>`.
//!
//! ## Primary model
//! - `use_free_model` with a Groq key: Groq's hosted free model
//! - `use_free_model` otherwise: local Ollama model
//! - else: `model` on the configured hosted provider
//!
//! ## Fallbacks
//! `fallback_models`, in order, on the hosted provider. Skipped when the
//! hosted provider has no API key.

use std::sync::Arc;
use std::time::Duration;

use folio_config::constants::llm;
use folio_config::settings::{LlmProviderKind, LlmSettings};

use crate::backend::{LlmBackend, LlmConfig, OllamaBackend, OpenAIBackend, OpenAIConfig};
use crate::fallback::FallbackChain;
use crate::LlmError;

/// Factory for creating LLM backends
pub struct LlmFactory;

impl LlmFactory {
    /// Primary backend plus configured fallbacks
    pub fn chain(settings: &LlmSettings) -> Result<FallbackChain, LlmError> {
        let primary = Self::primary(settings)?;
        let fallbacks = Self::fallbacks(settings)?;

        tracing::info!(
            primary = primary.model_name(),
            fallbacks = fallbacks.len(),
            "Initialized model chain"
        );

        Ok(FallbackChain::new(primary).with_fallbacks(fallbacks))
    }

    /// Create the primary backend
    pub fn primary(settings: &LlmSettings) -> Result<Arc<dyn LlmBackend>, LlmError> {
        if settings.use_free_model {
            return Self::free(settings);
        }

        match settings.provider {
            LlmProviderKind::Ollama => Self::ollama(settings, &settings.model),
            kind => {
                let api_key = settings.hosted_api_key().ok_or_else(|| {
                    LlmError::Configuration(format!("{:?} requires an API key", kind))
                })?;
                Self::hosted(settings, api_key, &settings.model)
            },
        }
    }

    /// Create fallback backends on the hosted provider
    pub fn fallbacks(settings: &LlmSettings) -> Result<Vec<Arc<dyn LlmBackend>>, LlmError> {
        if settings.provider == LlmProviderKind::Ollama {
            return Ok(Vec::new());
        }

        let Some(api_key) = settings.hosted_api_key() else {
            if !settings.fallback_models.is_empty() {
                tracing::warn!(
                    provider = ?settings.provider,
                    "No API key for fallback models, running without fallbacks"
                );
            }
            return Ok(Vec::new());
        };

        settings
            .fallback_models
            .iter()
            .map(|model| Self::hosted(settings, api_key.clone(), model))
            .collect()
    }

    fn free(settings: &LlmSettings) -> Result<Arc<dyn LlmBackend>, LlmError> {
        if settings.free_model_type == LlmProviderKind::Groq {
            if let Some(key) = settings.groq_key() {
                let config = OpenAIConfig::groq(key, llm::GROQ_MODEL)
                    .with_sampling(settings.temperature, settings.max_tokens)
                    .with_timeout(Duration::from_secs(settings.timeout_seconds));
                tracing::info!(model = llm::GROQ_MODEL, "Using free Groq model");
                return Ok(Arc::new(OpenAIBackend::new(config)?));
            }
            tracing::warn!("No Groq API key, using local Ollama model instead");
        }

        tracing::info!(model = llm::OLLAMA_MODEL, "Using free local model");
        Self::ollama(settings, llm::OLLAMA_MODEL)
    }

    fn hosted(
        settings: &LlmSettings,
        api_key: String,
        model: &str,
    ) -> Result<Arc<dyn LlmBackend>, LlmError> {
        let mut config = match settings.provider {
            LlmProviderKind::Groq => OpenAIConfig::groq(api_key, model),
            _ => OpenAIConfig::openai(api_key, model),
        }
        .with_sampling(settings.temperature, settings.max_tokens)
        .with_timeout(Duration::from_secs(settings.timeout_seconds));

        if let Some(endpoint) = &settings.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }

        Ok(Arc::new(OpenAIBackend::new(config)?))
    }

    fn ollama(settings: &LlmSettings, model: &str) -> Result<Arc<dyn LlmBackend>, LlmError> {
        let config = LlmConfig {
            model: model.to_string(),
            endpoint: settings.ollama_endpoint.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_seconds),
            max_retries: settings.max_retries,
            ..Default::default()
        };
        Ok(Arc::new(OllamaBackend::new(config)?))
    }
}
