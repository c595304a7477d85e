//! Portfolio Assistant Server
//!
//! HTTP surface over the answering pipeline, plus startup wiring.

pub mod bootstrap;
pub mod fallback;
pub mod http;
pub mod metrics;
pub mod state;

pub use bootstrap::{build_embedder, build_state, load_index};
pub use http::create_router;
pub use crate::metrics::{init_metrics, record_chat, record_request};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Startup(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<folio_core::Error> for ServerError {
    fn from(err: folio_core::Error) -> Self {
        match err {
            folio_core::Error::InvalidInput(msg) => ServerError::InvalidRequest(msg),
            folio_core::Error::IndexNotBuilt(msg) => ServerError::NotReady(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<folio_rag::RagError> for ServerError {
    fn from(err: folio_rag::RagError) -> Self {
        folio_core::Error::from(err).into()
    }
}
