// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::error::ServiceError;
use crate::responder::Reply;
use crate::upstream::ResponseBackend;
use crate::utils::logging::preview;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub entries: usize,
    pub max_entries: usize,
    pub timestamp: String,
}

/// Body of `POST /v1/chat`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<Value>,
}

pub async fn health_handler<B: ResponseBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<HealthResponse> {
    let cache = state.responder.cache();
    Json(HealthResponse {
        status: "healthy".to_string(),
        entries: cache.len(),
        max_entries: cache.config().max_entries,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

/// Handler for `/v1/chat`: answer from cache, or ask the backend and cache it
pub async fn chat_handler<B: ResponseBackend + 'static>(
    State(state): State<AppState<B>>,
    body: String,
) -> Result<Json<Reply>, ServiceError> {
    let req: ChatRequest = serde_json::from_str(&body).map_err(|e| {
        warn!("Failed to deserialize chat request: {}", e);
        ServiceError::InvalidRequest(format!("JSON deserialization error: {}", e))
    })?;

    debug!("Chat request: \"{}\"", preview(&req.message));

    let reply = state
        .responder
        .ask(&req.message, req.context.as_ref())
        .await?;
    Ok(Json(reply))
}

pub async fn stats_handler<B: ResponseBackend + 'static>(
    State(state): State<AppState<B>>,
) -> impl IntoResponse {
    Json(state.responder.cache().stats())
}

pub async fn export_handler<B: ResponseBackend + 'static>(
    State(state): State<AppState<B>>,
) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.responder.cache().export(),
    )
}

pub async fn import_handler<B: ResponseBackend + 'static>(
    State(state): State<AppState<B>>,
    body: String,
) -> Result<Json<Value>, ServiceError> {
    let cache = state.responder.cache();
    if !cache.import(&body) {
        return Err(ServiceError::InvalidRequest(
            "body is not a cache snapshot".to_string(),
        ));
    }

    info!("Cache replaced from uploaded snapshot ({} entries)", cache.len());
    Ok(Json(json!({ "imported": true, "entries": cache.len() })))
}

pub async fn clear_handler<B: ResponseBackend + 'static>(
    State(state): State<AppState<B>>,
) -> StatusCode {
    state.responder.cache().clear();
    info!("Cache cleared via admin endpoint");
    StatusCode::NO_CONTENT
}
