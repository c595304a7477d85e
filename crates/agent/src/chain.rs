//! Answer Generator
//!
//! One `answer()` call runs strictly in order:
//! memory update, retrieval, prompt formatting, generation (with fallback).
//!
//! Memory is built per call from the caller's history, so a single
//! generator can serve overlapping requests.

use std::sync::Arc;
use std::time::Instant;

use folio_config::settings::RagConfig;
use folio_core::{
    Answer, ConversationTurn, Error, Result, RetrieveOptions, Retriever, ScoredChunk, Source,
};
use folio_llm::{FallbackChain, PromptTemplate};

use crate::memory::ConversationMemory;

/// Answer generator configuration
#[derive(Debug, Clone)]
pub struct AnswerGeneratorConfig {
    /// Evidence chunks requested from the retriever
    pub top_k: usize,
}

impl Default for AnswerGeneratorConfig {
    fn default() -> Self {
        Self {
            top_k: folio_config::constants::rag::SMART_TOP_K,
        }
    }
}

impl From<&RagConfig> for AnswerGeneratorConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            top_k: config.final_top_k,
        }
    }
}

/// Retrieval-augmented answer generator
pub struct AnswerGenerator {
    retriever: Arc<dyn Retriever>,
    chain: FallbackChain,
    template: PromptTemplate,
    config: AnswerGeneratorConfig,
}

impl AnswerGenerator {
    pub fn new(retriever: Arc<dyn Retriever>, chain: FallbackChain, template: PromptTemplate) -> Self {
        Self {
            retriever,
            chain,
            template,
            config: AnswerGeneratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AnswerGeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Models in fallback order
    pub fn models(&self) -> Vec<&str> {
        self.chain.models()
    }

    /// Answer a question given the caller's full conversation history
    pub async fn answer(&self, question: &str, history: &[ConversationTurn]) -> Result<Answer> {
        let start = Instant::now();

        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("Question cannot be empty".to_string()));
        }

        let memory = ConversationMemory::from_history(history);

        let evidence = self.retrieve(question).await?;

        let messages = self.template.build(question, &evidence, &memory.history());

        let generation_start = Instant::now();
        let outcome = self.chain.run(&messages).await;
        metrics::histogram!("folio_generation_seconds").record(generation_start.elapsed().as_secs_f64());
        let outcome = outcome?;

        let answer = Answer {
            text: outcome.result.text.trim().to_string(),
            sources: evidence.iter().map(Source::from).collect(),
            model_used: outcome.model_used,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            model = %answer.model_used,
            attempts = outcome.attempts,
            sources = answer.sources.len(),
            history = memory.len(),
            elapsed_ms = answer.elapsed.as_millis() as u64,
            "Answered question"
        );

        Ok(answer)
    }

    /// Evidence for a question; only fatal retrieval errors propagate
    async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let start = Instant::now();
        let options = RetrieveOptions::default().with_top_k(self.config.top_k);
        let result = self.retriever.retrieve(question, &options).await;
        metrics::histogram!("folio_retrieval_seconds").record(start.elapsed().as_secs_f64());

        let evidence = match result {
            Ok(evidence) => evidence,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    retriever = self.retriever.name(),
                    error = %e,
                    "Retrieval failed, answering without evidence"
                );
                Vec::new()
            },
        };

        if evidence.is_empty() {
            tracing::info!(error = %Error::NoKnowledgeFound, "Generating without evidence");
        }

        Ok(evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_core::{Chunk, MatchSource};
    use folio_llm::{FinishReason, GenerationResult, LlmBackend, LlmError, Message};
    use parking_lot::Mutex;

    struct StaticRetriever {
        result: Mutex<Option<Result<Vec<ScoredChunk>>>>,
    }

    impl StaticRetriever {
        fn new(result: Result<Vec<ScoredChunk>>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
            })
        }
    }

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn retrieve(&self, _query: &str, _options: &RetrieveOptions) -> Result<Vec<ScoredChunk>> {
            self.result.lock().take().unwrap_or_else(|| Ok(Vec::new()))
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    /// Echoes the last message so tests can inspect the prompt
    struct EchoBackend {
        last_prompt: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn generate(&self, messages: &[Message]) -> std::result::Result<GenerationResult, LlmError> {
            *self.last_prompt.lock() = messages.to_vec();
            Ok(GenerationResult {
                text: " echoed \n".to_string(),
                tokens: 1,
                total_time_ms: 0,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn echo() -> Arc<EchoBackend> {
        Arc::new(EchoBackend {
            last_prompt: Mutex::new(Vec::new()),
        })
    }

    fn scored(id: &str, text: &str) -> ScoredChunk {
        ScoredChunk::new(Chunk::with_id(id, text), 0.5, MatchSource::Hybrid)
    }

    #[tokio::test]
    async fn test_answer_packages_sources_and_model() {
        let backend = echo();
        let generator = AnswerGenerator::new(
            StaticRetriever::new(Ok(vec![scored("a", "MSc Computer Science")])),
            FallbackChain::new(backend.clone()),
            PromptTemplate::new("Jane Doe"),
        );

        let history = vec![ConversationTurn::user("hello"), ConversationTurn::assistant("hi")];
        let answer = generator.answer("What degree?", &history).await.unwrap();

        assert_eq!(answer.text, "echoed");
        assert_eq!(answer.model_used, "echo");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].content, "MSc Computer Science");

        let prompt = backend.last_prompt.lock().clone();
        assert_eq!(prompt.len(), 4);
        assert!(prompt[3].content.contains("MSc Computer Science"));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let generator = AnswerGenerator::new(
            StaticRetriever::new(Ok(Vec::new())),
            FallbackChain::new(echo()),
            PromptTemplate::default(),
        );
        let err = generator.answer("   ", &[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_index_not_built_fails_fast() {
        let generator = AnswerGenerator::new(
            StaticRetriever::new(Err(Error::IndexNotBuilt("knowledge index".to_string()))),
            FallbackChain::new(echo()),
            PromptTemplate::default(),
        );
        let err = generator.answer("Skills?", &[]).await.unwrap_err();
        assert!(matches!(err, Error::IndexNotBuilt(_)));
    }

    #[tokio::test]
    async fn test_retrieval_failure_still_answers() {
        let generator = AnswerGenerator::new(
            StaticRetriever::new(Err(Error::Rag("both channels down".to_string()))),
            FallbackChain::new(echo()),
            PromptTemplate::default(),
        );
        let answer = generator.answer("Skills?", &[]).await.unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(answer.model_used, "echo");
    }
}
