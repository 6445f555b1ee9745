//! Axum-based HTTP surface for the replycache service.
//!
//! Exposes the cached chat endpoint plus cache administration (stats,
//! export/import, clear), health and Prometheus metrics.
//!
//! # Components
//!
//! - `handlers`: Individual endpoint implementations.
//! - `routes`: Router wiring, shared state and request ID layers.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod routes;

pub use handlers::{ChatRequest, HealthResponse};
pub use routes::{create_router, AppState};
