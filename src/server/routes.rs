// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    chat_handler, clear_handler, export_handler, health_handler, import_handler, metrics_handler,
    stats_handler,
};
use crate::responder::CachedResponder;
use crate::upstream::ResponseBackend;
use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Upper bound on request bodies, sized for cache snapshots.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub struct AppState<B> {
    pub responder: Arc<CachedResponder<B>>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            responder: Arc::clone(&self.responder),
        }
    }
}

pub fn create_router<B: ResponseBackend + 'static>(responder: Arc<CachedResponder<B>>) -> Router {
    let state = AppState { responder };

    Router::new()
        .route("/health", get(health_handler::<B>))
        .route("/metrics", get(metrics_handler))
        .route("/v1/chat", post(chat_handler::<B>))
        .route("/cache/stats", get(stats_handler::<B>))
        .route("/cache/export", get(export_handler::<B>))
        .route("/cache/import", post(import_handler::<B>))
        .route("/cache/clear", post(clear_handler::<B>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
