//! HTTP routes and handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use nameguard_core::DetectionResult;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use crate::state::AppState;

/// Longest comment accepted for screening
const MAX_COMMENT_CHARS: usize = 1000;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/detect-name", post(detect_name))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/sanctions/reload", post(reload_sanctions))
        .route("/metrics", get(metrics_endpoint))
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DetectRequest {
    comment: String,
}

#[derive(Debug, Serialize)]
struct DetectResponse {
    request_id: String,
    #[serde(flatten)]
    result: DetectionResult,
}

/// Screen one payment comment for a person name
async fn detect_name(
    State(state): State<AppState>,
    Json(req): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    if req.comment.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "comment must not be empty".to_string(),
        ));
    }
    if req.comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "comment exceeds {} characters",
            MAX_COMMENT_CHARS
        )));
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let result = state.pipeline.detect(&request_id, &req.comment).await;

    Ok(Json(DetectResponse { request_id, result }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    tagger_ready: bool,
    verifier_ready: bool,
    sanctions_loaded: bool,
    sanctions_records: usize,
    cache_size: Option<usize>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        tagger_ready: state.tagger.is_ready(),
        verifier_ready: state.pipeline.verifier_ready(),
        sanctions_loaded: state.sanctions.is_loaded(),
        sanctions_records: state.sanctions.stats().total_names,
        cache_size: state.pipeline.cache_stats().map(|c| c.size),
    })
}

async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "uptime_secs": state.started.elapsed().as_secs(),
        "pipeline": state.pipeline.stats(),
        "cache": state.pipeline.cache_stats(),
        "sanctions": state.sanctions.stats(),
    }))
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    reloaded: usize,
}

/// Rebuild the sanctions index from its table file
async fn reload_sanctions(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let registry = state.sanctions.clone();
    let count = tokio::task::spawn_blocking(move || registry.reload())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(records = count, "sanctions registry reloaded");
    Ok(Json(ReloadResponse { reloaded: count }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Error handling
#[derive(Debug)]
enum AppError {
    InvalidRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = json!({
            "error": {
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}
