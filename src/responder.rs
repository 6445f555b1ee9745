// Read-through responder: cache first, backend on miss
// Author: kelexine (https://github.com/kelexine)

use crate::cache::ResponseCache;
use crate::error::{Result, ServiceError};
use crate::metrics;
use crate::upstream::ResponseBackend;
use crate::utils::logging::preview;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A reply and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    #[serde(rename = "response")]
    pub text: String,
    pub cached: bool,
}

/// Puts a `ResponseCache` in front of a `ResponseBackend`.
pub struct CachedResponder<B> {
    cache: Arc<ResponseCache>,
    backend: B,
}

impl<B: ResponseBackend> CachedResponder<B> {
    pub fn new(cache: Arc<ResponseCache>, backend: B) -> Self {
        Self { cache, backend }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Answer `input`, from cache when possible.
    ///
    /// Backend failures are returned as-is and nothing is cached for them.
    pub async fn ask(&self, input: &str, context: Option<&Value>) -> Result<Reply> {
        if input.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("message must not be empty".to_string()));
        }

        if let Some(text) = self.cache.get(input, context) {
            debug!("Cache hit for \"{}\"", preview(input));
            return Ok(Reply { text, cached: true });
        }

        debug!("Cache miss for \"{}\"", preview(input));
        let started = Instant::now();
        let outcome = self.backend.respond(input, context).await;
        metrics::record_backend_call(outcome.is_ok(), started.elapsed().as_secs_f64());
        let text = outcome?;

        self.cache.set(
            input,
            text.clone(),
            context,
            Some(json!({ "source": "backend" })),
        );
        info!(
            "Cached backend reply for \"{}\" ({} chars)",
            preview(input),
            text.chars().count()
        );

        Ok(Reply {
            text,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ResponseBackend for CountingBackend {
        fn respond(
            &self,
            input: &str,
            _context: Option<&Value>,
        ) -> impl Future<Output = Result<String>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            let reply = format!("echo: {}", input);
            async move {
                if fail {
                    Err(ServiceError::Upstream("boom".to_string()))
                } else {
                    Ok(reply)
                }
            }
        }
    }

    fn responder(fail: bool) -> CachedResponder<CountingBackend> {
        let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
        CachedResponder::new(
            cache,
            CountingBackend {
                fail,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_second_ask_is_served_from_cache() {
        let responder = responder(false);

        let first = responder.ask("What is SPIN selling?", None).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.text, "echo: What is SPIN selling?");

        let second = responder.ask("what is spin selling", None).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.text, first.text);
        assert_eq!(responder.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_cached() {
        let responder = responder(true);

        assert!(matches!(
            responder.ask("hello", None).await,
            Err(ServiceError::Upstream(_))
        ));
        assert!(responder.cache().is_empty());
        assert!(responder.ask("hello", None).await.is_err());
        assert_eq!(responder.backend().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let responder = responder(false);
        assert!(matches!(
            responder.ask("   ", None).await,
            Err(ServiceError::InvalidRequest(_))
        ));
        assert_eq!(responder.backend().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_replies_carry_metadata() {
        let responder = responder(false);
        responder.ask("pricing", None).await.unwrap();

        let dump: Value = serde_json::from_str(&responder.cache().export()).unwrap();
        assert_eq!(dump["entries"][0][1]["metadata"]["source"], "backend");
    }
}
