//! HTTP Endpoints
//!
//! REST API for the portfolio assistant.

use axum::{
    extract::{Json, Query, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use folio_core::{Chunk, ConversationTurn, Metadata, Source};

use crate::fallback::{fallback_message, suggestions};
use crate::metrics::{metrics_handler, record_chat, record_request};
use crate::state::AppState;
use crate::ServerError;

/// Model name reported when the fixed fallback message is returned
const FALLBACK_MODEL: &str = "fallback";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds);

    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/suggestions", get(get_suggestions))
        .route("/api/v1/clear-history", post(clear_history))
        .route("/api/v1/info", get(info))
        // Admin endpoints
        .route("/api/v1/admin/documents", post(add_documents))
        .route("/api/v1/admin/weights", put(update_weights))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If no configured origin parses, defaults to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    let parsed_origins = if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        parsed_origins
    };

    tracing::info!(origins = parsed_origins.len(), "CORS configured");
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}

/// Chat request
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    session_id: Option<String>,
}

/// Chat response
#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    sources: Vec<Source>,
    conversation_id: String,
    timestamp: DateTime<Utc>,
    model_used: String,
    processing_time: f64,
}

/// Chat endpoint
///
/// Pipeline failures are answered with the fixed fallback message rather
/// than an error status.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let start = Instant::now();

    let max_chars = state.config.server.max_message_chars;
    let chars = request.message.chars().count();
    if chars == 0 || chars > max_chars {
        record_request("chat", StatusCode::UNPROCESSABLE_ENTITY);
        return Err(ServerError::InvalidRequest(format!(
            "message must be 1 to {} characters, got {}",
            max_chars, chars
        )));
    }

    let conversation_id = request
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let result = state
        .generator
        .answer(&request.message, &request.conversation_history)
        .await;

    let response = match result {
        Ok(answer) => {
            record_chat(&answer.model_used, answer.elapsed);
            ChatResponse {
                processing_time: answer.elapsed_secs(),
                response: answer.text,
                sources: answer.sources,
                conversation_id,
                timestamp: Utc::now(),
                model_used: answer.model_used,
            }
        },
        Err(folio_core::Error::InvalidInput(msg)) => {
            record_request("chat", StatusCode::UNPROCESSABLE_ENTITY);
            return Err(ServerError::InvalidRequest(msg));
        },
        Err(e) => {
            tracing::error!(
                error = %e,
                conversation_id = %conversation_id,
                "Answer pipeline failed, returning fallback message"
            );
            ChatResponse {
                response: fallback_message(state.subject()),
                sources: Vec::new(),
                conversation_id,
                timestamp: Utc::now(),
                model_used: FALLBACK_MODEL.to_string(),
                processing_time: start.elapsed().as_secs_f64(),
            }
        },
    };

    tracing::info!(
        conversation_id = %response.conversation_id,
        model = %response.model_used,
        sources = response.sources.len(),
        "Chat request processed"
    );
    record_request("chat", StatusCode::OK);
    Ok(Json(response))
}

/// Health check
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let ready = state.index.is_ready();
    record_request("health", StatusCode::OK);

    Json(serde_json::json!({
        "status": if ready { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
        "vector_store_status": if ready { "ready" } else { "not_initialized" },
        "documents_loaded": state.index.document_count(),
    }))
}

/// Suggested questions
async fn get_suggestions(State(state): State<AppState>) -> Json<serde_json::Value> {
    record_request("suggestions", StatusCode::OK);
    Json(serde_json::json!({
        "suggestions": suggestions(state.subject()),
        "timestamp": Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
struct ClearHistoryParams {
    session_id: String,
}

/// Clear history
///
/// The client owns the history and memory is rebuilt per request, so there
/// is nothing held server-side; this only acknowledges.
async fn clear_history(Query(params): Query<ClearHistoryParams>) -> Json<serde_json::Value> {
    tracing::info!(session_id = %params.session_id, "Cleared conversation history");
    record_request("clear_history", StatusCode::OK);
    Json(serde_json::json!({
        "message": "Conversation history cleared successfully",
        "session_id": params.session_id,
    }))
}

/// Assistant info
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    record_request("info", StatusCode::OK);
    Json(serde_json::json!({
        "name": "Portfolio Assistant",
        "version": env!("CARGO_PKG_VERSION"),
        "description": format!(
            "AI-powered chatbot to answer questions about {}'s professional profile",
            state.subject()
        ),
        "capabilities": [
            "Answer questions about technical skills and expertise",
            "Provide detailed information about projects",
            "Share educational background and certifications",
            "Discuss professional experience",
            "Provide contact information",
        ],
        "features": [
            "Multi-turn conversations with client-held history",
            "Hybrid search (semantic + keyword) with rank fusion",
            "Query classification and re-ranking",
            "Source citations for responses",
            "Model fallback chain",
        ],
        "models": state.generator.models(),
    }))
}

#[derive(Debug, Deserialize)]
struct NewDocument {
    content: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
struct AddDocumentsRequest {
    documents: Vec<NewDocument>,
}

/// Append documents to the knowledge base
///
/// The new index set is fully built before it replaces the current one.
async fn add_documents(
    State(state): State<AppState>,
    Json(request): Json<AddDocumentsRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if request.documents.is_empty() {
        record_request("add_documents", StatusCode::UNPROCESSABLE_ENTITY);
        return Err(ServerError::InvalidRequest("documents cannot be empty".to_string()));
    }

    let mut chunks = Vec::new();
    for document in &request.documents {
        if document.content.trim().is_empty() {
            record_request("add_documents", StatusCode::UNPROCESSABLE_ENTITY);
            return Err(ServerError::InvalidRequest(
                "document content cannot be empty".to_string(),
            ));
        }

        for text in state.splitter.split(&document.content) {
            let mut chunk = Chunk::new(text);
            chunk.metadata = document.metadata.clone();
            chunk
                .metadata
                .entry("source".to_string())
                .or_insert_with(|| serde_json::Value::from("admin"));
            chunks.push(chunk);
        }
    }

    let chunks_added = chunks.len();
    let documents_loaded = state.index.append(chunks).await?;

    tracing::info!(
        documents = request.documents.len(),
        chunks = chunks_added,
        documents_loaded,
        "Appended documents to knowledge base"
    );
    record_request("add_documents", StatusCode::OK);

    Ok(Json(serde_json::json!({
        "documents_added": request.documents.len(),
        "chunks_added": chunks_added,
        "documents_loaded": documents_loaded,
    })))
}

#[derive(Debug, Deserialize)]
struct WeightsRequest {
    semantic_weight: f32,
    keyword_weight: f32,
}

/// Change fusion weights; the indexes are untouched
async fn update_weights(
    State(state): State<AppState>,
    Json(request): Json<WeightsRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if let Err(e) = state
        .retriever
        .update_weights(request.semantic_weight, request.keyword_weight)
    {
        record_request("update_weights", StatusCode::UNPROCESSABLE_ENTITY);
        return Err(ServerError::InvalidRequest(e.to_string()));
    }

    record_request("update_weights", StatusCode::OK);
    let weights = state.retriever.weights();
    Ok(Json(serde_json::json!({
        "semantic_weight": weights.semantic,
        "keyword_weight": weights.keyword,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    use folio_agent::AnswerGenerator;
    use folio_config::Settings;
    use folio_llm::{
        FallbackChain, FinishReason, GenerationResult, LlmBackend, LlmError, Message,
        PromptTemplate,
    };
    use folio_rag::{HashEmbedder, HybridRetriever, KnowledgeIndex, RetrieverConfig, SmartRetriever};

    struct CannedBackend {
        fail: bool,
    }

    #[async_trait]
    impl LlmBackend for CannedBackend {
        async fn generate(&self, _messages: &[Message]) -> Result<GenerationResult, LlmError> {
            if self.fail {
                return Err(LlmError::Timeout);
            }
            Ok(GenerationResult {
                text: "Contact email: foo@example.com".to_string(),
                tokens: 5,
                total_time_ms: 1,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn is_available(&self) -> bool {
            !self.fail
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    async fn state(fail: bool) -> AppState {
        let index = Arc::new(KnowledgeIndex::new(Arc::new(HashEmbedder::default()), None));
        index
            .build(vec![
                Chunk::with_id("contact", "Contact email: foo@example.com"),
                Chunk::with_id("skills", "Python, Rust and SQL"),
            ])
            .await
            .unwrap();

        let hybrid = Arc::new(HybridRetriever::new(index.clone(), RetrieverConfig::default()).unwrap());
        let generator = AnswerGenerator::new(
            Arc::new(SmartRetriever::new(hybrid.clone())),
            FallbackChain::new(Arc::new(CannedBackend { fail })),
            PromptTemplate::new("Jane Doe"),
        );

        let mut settings = Settings::default();
        settings.llm.subject = "Jane Doe".to_string();
        AppState::new(settings, index, hybrid, Arc::new(generator))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_answers_with_sources() {
        let app = create_router(state(false).await);
        let response = app
            .oneshot(post_json(
                "/api/v1/chat",
                serde_json::json!({
                    "message": "What is the contact email?",
                    "conversation_history": [
                        {"role": "user", "content": "Hi", "timestamp": "2024-01-01T10:00:00"},
                        {"role": "assistant", "content": "Hello!"}
                    ],
                    "session_id": "abc"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["response"], "Contact email: foo@example.com");
        assert_eq!(body["model_used"], "canned");
        assert_eq!(body["conversation_id"], "abc");
        assert!(!body["sources"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_message_length() {
        let app = create_router(state(false).await);
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/chat", serde_json::json!({"message": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .oneshot(post_json(
                "/api/v1/chat",
                serde_json::json!({"message": "x".repeat(1001)}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_chat_pipeline_failure_returns_fallback_message() {
        let app = create_router(state(true).await);
        let response = app
            .oneshot(post_json(
                "/api/v1/chat",
                serde_json::json!({"message": "What is the contact email?"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["model_used"], "fallback");
        assert!(body["sources"].as_array().unwrap().is_empty());
        assert!(body["response"]
            .as_str()
            .unwrap()
            .starts_with("I apologize, but I'm having trouble"));
        assert!(!body["conversation_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_reports_documents() {
        let app = create_router(state(false).await);
        let response = app.oneshot(get("/api/v1/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["vector_store_status"], "ready");
        assert_eq!(body["documents_loaded"], 2);
    }

    #[tokio::test]
    async fn test_suggestions_and_info() {
        let app = create_router(state(false).await);

        let body = json_body(app.clone().oneshot(get("/api/v1/suggestions")).await.unwrap()).await;
        assert_eq!(body["suggestions"].as_array().unwrap().len(), 6);

        let body = json_body(app.oneshot(get("/api/v1/info")).await.unwrap()).await;
        assert_eq!(body["name"], "Portfolio Assistant");
        assert_eq!(body["models"], serde_json::json!(["canned"]));
    }

    #[tokio::test]
    async fn test_clear_history_acknowledges() {
        let app = create_router(state(false).await);
        let response = app
            .oneshot(post_json("/api/v1/clear-history?session_id=abc", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["session_id"], "abc");
    }

    #[tokio::test]
    async fn test_add_documents_swaps_index() {
        let state = state(false).await;
        let index = state.index.clone();
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                "/api/v1/admin/documents",
                serde_json::json!({
                    "documents": [
                        {"content": "Certified Kubernetes Administrator", "metadata": {"section": "certifications"}}
                    ]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["documents_loaded"], 3);
        assert_eq!(index.document_count(), 3);
    }

    #[tokio::test]
    async fn test_add_documents_rejects_empty() {
        let app = create_router(state(false).await);
        let response = app
            .oneshot(post_json("/api/v1/admin/documents", serde_json::json!({"documents": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_update_weights() {
        let state = state(false).await;
        let retriever = state.retriever.clone();
        let app = create_router(state);

        let request = Request::builder()
            .method("PUT")
            .uri("/api/v1/admin/weights")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"semantic_weight": 0.5, "keyword_weight": 0.5}).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(retriever.weights().keyword, 0.5);

        let request = Request::builder()
            .method("PUT")
            .uri("/api/v1/admin/weights")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"semantic_weight": -1.0, "keyword_weight": 0.5}).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_metrics_disabled_without_recorder() {
        let app = create_router(state(false).await);
        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
