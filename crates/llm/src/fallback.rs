//! Model fallback chain
//!
//! Generation walks an explicit state machine:
//!
//! ```text
//! Primary --fail--> Fallback(0) --fail--> ... --fail--> Fallback(n-1) --fail--> Exhausted
//!    \__________________ success at any state: done ___________________/
//! ```
//!
//! Each backend is tried once, in order, with the same messages. Attempts are
//! sequential. On exhaustion the primary's error is reported.

use std::sync::Arc;

use crate::backend::{GenerationResult, LlmBackend};
use crate::prompt::Message;
use crate::LlmError;

/// Position in the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Primary,
    Fallback(usize),
    Exhausted,
}

impl ChainState {
    /// State after a failure in `self`, given `fallbacks` alternates
    pub fn next(self, fallbacks: usize) -> Self {
        match self {
            ChainState::Primary if fallbacks > 0 => ChainState::Fallback(0),
            ChainState::Fallback(i) if i + 1 < fallbacks => ChainState::Fallback(i + 1),
            _ => ChainState::Exhausted,
        }
    }
}

/// Successful generation plus which model produced it
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub result: GenerationResult,
    pub model_used: String,
    pub attempts: usize,
}

/// Every backend failed
#[derive(Debug, Clone, thiserror::Error)]
#[error("All {attempts} model attempts failed; {model}: {message}")]
pub struct ChainError {
    /// Primary model name
    pub model: String,
    pub attempts: usize,
    /// Primary model's error
    pub message: String,
}

impl From<ChainError> for folio_core::Error {
    fn from(err: ChainError) -> Self {
        folio_core::Error::ModelUnavailable {
            model: err.model,
            attempts: err.attempts,
            message: err.message,
        }
    }
}

/// Primary backend plus ordered alternates
#[derive(Clone)]
pub struct FallbackChain {
    primary: Arc<dyn LlmBackend>,
    fallbacks: Vec<Arc<dyn LlmBackend>>,
}

impl FallbackChain {
    pub fn new(primary: Arc<dyn LlmBackend>) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<Arc<dyn LlmBackend>>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn primary_model(&self) -> &str {
        self.primary.model_name()
    }

    /// Model names in try order
    pub fn models(&self) -> Vec<&str> {
        std::iter::once(self.primary.model_name())
            .chain(self.fallbacks.iter().map(|b| b.model_name()))
            .collect()
    }

    fn backend(&self, state: ChainState) -> Option<&Arc<dyn LlmBackend>> {
        match state {
            ChainState::Primary => Some(&self.primary),
            ChainState::Fallback(i) => self.fallbacks.get(i),
            ChainState::Exhausted => None,
        }
    }

    /// Generate with the first backend that succeeds
    pub async fn run(&self, messages: &[Message]) -> Result<ChainOutcome, ChainError> {
        let mut state = ChainState::Primary;
        let mut attempts = 0;
        let mut primary_error: Option<LlmError> = None;

        while let Some(backend) = self.backend(state) {
            attempts += 1;
            let model = backend.model_name();

            match backend.generate(messages).await {
                Ok(result) => {
                    if attempts > 1 {
                        tracing::info!(model, attempts, "Fallback model succeeded");
                    }
                    return Ok(ChainOutcome {
                        result,
                        model_used: model.to_string(),
                        attempts,
                    });
                },
                Err(e) => {
                    let next = state.next(self.fallbacks.len());
                    metrics::counter!("folio_model_fallbacks_total", "model" => model.to_string())
                        .increment(1);

                    if let Some(next_backend) = self.backend(next) {
                        tracing::warn!(
                            model,
                            next = next_backend.model_name(),
                            error = %e,
                            "Model failed, falling back"
                        );
                    }

                    if primary_error.is_none() {
                        primary_error = Some(e);
                    }
                    state = next;
                },
            }
        }

        let message = primary_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no model attempted".to_string());

        tracing::error!(
            primary = self.primary.model_name(),
            attempts,
            error = %message,
            "All models failed"
        );

        Err(ChainError {
            model: self.primary.model_name().to_string(),
            attempts,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FinishReason;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Backend that fails or answers with its own name, counting calls
    struct ScriptedBackend {
        name: String,
        fail: bool,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn ok(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail: false,
                calls: Mutex::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fail: true,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, _messages: &[Message]) -> Result<GenerationResult, LlmError> {
            *self.calls.lock() += 1;
            if self.fail {
                return Err(LlmError::Api(format!("{} is down", self.name)));
            }
            Ok(GenerationResult {
                text: format!("answer from {}", self.name),
                tokens: 3,
                total_time_ms: 1,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn is_available(&self) -> bool {
            !self.fail
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(ChainState::Primary.next(2), ChainState::Fallback(0));
        assert_eq!(ChainState::Fallback(0).next(2), ChainState::Fallback(1));
        assert_eq!(ChainState::Fallback(1).next(2), ChainState::Exhausted);
        assert_eq!(ChainState::Primary.next(0), ChainState::Exhausted);
        assert_eq!(ChainState::Exhausted.next(2), ChainState::Exhausted);
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallbacks() {
        let primary = ScriptedBackend::ok("primary");
        let fallback = ScriptedBackend::ok("fallback");
        let chain = FallbackChain::new(primary.clone()).with_fallbacks(vec![fallback.clone()]);

        let outcome = chain.run(&[Message::user("hi")]).await.unwrap();
        assert_eq!(outcome.model_used, "primary");
        assert_eq!(outcome.attempts, 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_in_order() {
        let primary = ScriptedBackend::failing("primary");
        let first = ScriptedBackend::failing("first");
        let second = ScriptedBackend::ok("second");
        let chain = FallbackChain::new(primary.clone())
            .with_fallbacks(vec![first.clone(), second.clone()]);

        let outcome = chain.run(&[Message::user("hi")]).await.unwrap();
        assert_eq!(outcome.model_used, "second");
        assert_eq!(outcome.result.text, "answer from second");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(primary.calls(), 1);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_primary_error() {
        let chain = FallbackChain::new(ScriptedBackend::failing("primary"))
            .with_fallbacks(vec![ScriptedBackend::failing("backup")]);

        let err = chain.run(&[Message::user("hi")]).await.unwrap_err();
        assert_eq!(err.model, "primary");
        assert_eq!(err.attempts, 2);
        assert!(err.message.contains("primary is down"));

        let core: folio_core::Error = err.into();
        assert!(matches!(core, folio_core::Error::ModelUnavailable { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_no_fallbacks() {
        let chain = FallbackChain::new(ScriptedBackend::failing("only"));
        let err = chain.run(&[Message::user("hi")]).await.unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(chain.models(), vec!["only"]);
    }
}
