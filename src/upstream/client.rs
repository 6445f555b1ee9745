// HTTP backend client
// Author: kelexine (https://github.com/kelexine)

use super::models::{RespondRequest, RespondResponse};
use super::ResponseBackend;
use crate::config::UpstreamConfig;
use crate::error::{Result, ServiceError};
use crate::utils::logging::preview;
use crate::utils::retry::{parse_retry_after_header, with_retry, AttemptError};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

/// Attempts per reply, first try included.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backend that posts `{ message, context }` as JSON and reads `{ response }`.
pub struct HttpBackend {
    http_client: Client,
    config: UpstreamConfig,
    max_attempts: u32,
}

impl HttpBackend {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| ServiceError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created upstream HTTP client for {}", config.url);

        Ok(Self {
            http_client,
            config: config.clone(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Override the attempt budget (minimum one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn call_once(
        &self,
        input: &str,
        context: Option<&Value>,
    ) -> std::result::Result<String, AttemptError> {
        let mut request = self.http_client.post(&self.config.url).json(&RespondRequest {
            message: input,
            context,
        });
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptError::new(0, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after_header);
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        // A malformed success body is not worth retrying; keep the 2xx status
        // so the retry loop gives up immediately.
        let parsed: RespondResponse = response.json().await.map_err(|e| {
            AttemptError::new(status.as_u16(), format!("unreadable response body: {}", e))
        })?;
        Ok(parsed.response)
    }
}

impl ResponseBackend for HttpBackend {
    fn respond(
        &self,
        input: &str,
        context: Option<&Value>,
    ) -> impl Future<Output = Result<String>> + Send {
        async move {
            debug!("Calling upstream for \"{}\"", preview(input));

            with_retry("upstream respond", self.max_attempts, || {
                self.call_once(input, context)
            })
            .await
            .map_err(|err| {
                error!("Upstream call failed: HTTP {} - {}", err.status, err.body);
                match err.status {
                    0 => ServiceError::Upstream(format!("request failed: {}", err.body)),
                    429 => ServiceError::TooManyRequests(err.body),
                    503 | 504 => ServiceError::ServiceUnavailable(err.body),
                    status => ServiceError::Upstream(format!("HTTP {}: {}", status, err.body)),
                }
            })
        }
    }
}
