// Error types for the replycache service
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream backend error: {0}")]
    Upstream(String),

    #[error("Upstream rate limited: {0}")]
    TooManyRequests(String),

    #[error("Upstream unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Convert ServiceError to HTTP responses for Axum
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ServiceError::InvalidRequest(_) | ServiceError::Json(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            ServiceError::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error"),
            ServiceError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable")
            }
            ServiceError::Upstream(_) | ServiceError::Http(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ServiceError::Config(_) | ServiceError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
