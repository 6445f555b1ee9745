//! Structured logging setup.
//!
//! Configures the `tracing` ecosystem for the service and offers a helper to
//! keep user questions from flooding log lines.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{Result, ServiceError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Longest input excerpt written to logs.
const PREVIEW_CHARS: usize = 80;

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = match config.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    installed.map_err(|e| ServiceError::Internal(format!("Failed to install logger: {}", e)))
}

/// Shorten a user-supplied input for log output, on a char boundary.
pub fn preview(input: &str) -> String {
    let mut chars = input.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_input_unchanged() {
        assert_eq!(preview("Bonjour"), "Bonjour");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = preview(&long);
        assert_eq!(out.chars().count(), PREVIEW_CHARS + 1);
        assert!(out.ends_with('…'));
    }
}
