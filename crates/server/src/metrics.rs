//! Prometheus metrics
//!
//! The recorder is process-global. `init_metrics` installs it once and hands
//! back the render handle the `/metrics` route serves from.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

use crate::state::AppState;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Install the Prometheus recorder; later calls return the same handle
///
/// Concurrent first callers block until the single install attempt finishes.
/// A failed install is not retried.
pub fn init_metrics() -> Option<PrometheusHandle> {
    HANDLE.get_or_init(install).clone()
}

fn install() -> Option<PrometheusHandle> {
    let recorder = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), LATENCY_BUCKETS)
        .and_then(|builder| builder.install_recorder());

    match recorder {
        Ok(handle) => {
            describe();
            Some(handle)
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            None
        },
    }
}

fn describe() {
    ::metrics::describe_counter!("folio_requests_total", "HTTP requests by endpoint and status");
    ::metrics::describe_histogram!("folio_chat_seconds", "End-to-end chat latency");
    ::metrics::describe_histogram!("folio_retrieval_seconds", "Evidence retrieval latency");
    ::metrics::describe_histogram!("folio_generation_seconds", "Model generation latency including fallbacks");
    ::metrics::describe_counter!("folio_model_fallbacks_total", "Generation failures that advanced the fallback chain");
    ::metrics::describe_counter!("folio_retrieval_degraded_total", "Queries answered by a single retrieval channel");
}

/// Count a request
pub fn record_request(endpoint: &'static str, status: StatusCode) {
    ::metrics::counter!(
        "folio_requests_total",
        "endpoint" => endpoint,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

/// Record end-to-end chat latency, labeled by the model that answered
pub fn record_chat(model: &str, elapsed: Duration) {
    ::metrics::histogram!("folio_chat_seconds", "model" => model.to_string())
        .record(elapsed.as_secs_f64());
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
