// HTTP surface tests against an in-process router
// Author: kelexine (https://github.com/kelexine)

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use replycache::cache::{CacheConfig, ResponseCache};
use replycache::error::{Result, ServiceError};
use replycache::responder::CachedResponder;
use replycache::server::create_router;
use replycache::upstream::ResponseBackend;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Default)]
struct StubBackend {
    calls: AtomicUsize,
}

impl ResponseBackend for StubBackend {
    fn respond(
        &self,
        input: &str,
        _context: Option<&Value>,
    ) -> impl Future<Output = Result<String>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = if input.contains("fail") {
            Err(ServiceError::ServiceUnavailable("backend down".to_string()))
        } else {
            Ok(format!("answer to {}", input))
        };
        async move { outcome }
    }
}

fn app() -> (Router, Arc<CachedResponder<StubBackend>>) {
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
    let responder = Arc::new(CachedResponder::new(cache, StubBackend::default()));
    (create_router(responder.clone()), responder)
}

async fn send(app: &Router, method: &str, uri: &str, body: impl Into<Body>) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn chat(message: &str) -> String {
    json!({ "message": message }).to_string()
}

#[tokio::test]
async fn test_chat_caches_second_request() {
    let (app, responder) = app();

    let (status, body) = send(&app, "POST", "/v1/chat", chat("Vos formations?")).await;
    assert_eq!(status, StatusCode::OK);
    let first: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(first["cached"], false);
    assert_eq!(first["response"], "answer to Vos formations?");

    let (_, body) = send(&app, "POST", "/v1/chat", chat("vos formations")).await;
    let second: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(second["cached"], true);
    assert_eq!(second["response"], first["response"]);

    assert_eq!(responder.backend().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chat_rejects_malformed_body() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/v1/chat", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_chat_surfaces_backend_failure() {
    let (app, responder) = app();
    let (status, _) = send(&app, "POST", "/v1/chat", chat("please fail")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(responder.cache().is_empty());
}

#[tokio::test]
async fn test_stats_export_import_clear() {
    let (app, responder) = app();
    send(&app, "POST", "/v1/chat", chat("hello")).await;
    send(&app, "POST", "/v1/chat", chat("Hello!")).await;

    let (status, body) = send(&app, "GET", "/cache/stats", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["topEntries"][0]["hits"], 1);
    assert!(stats["memoryUsageEstimate"].as_u64().unwrap() > 0);

    let (status, snapshot) = send(&app, "GET", "/cache/export", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/cache/clear", Body::empty()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(responder.cache().is_empty());

    let (status, body) = send(&app, "POST", "/cache/import", snapshot).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["entries"], 1);
    assert_eq!(responder.cache().get("hello", None), Some("answer to hello".to_string()));
}

#[tokio::test]
async fn test_import_rejects_garbage() {
    let (app, responder) = app();
    responder.cache().set("kept", "yes", None, None);

    let (status, _) = send(&app, "POST", "/cache/import", r#"{"bad": true}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(responder.cache().has("kept", None));
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, _) = app();

    let (status, body) = send(&app, "GET", "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["max_entries"], 1000);

    send(&app, "POST", "/v1/chat", chat("metrics please")).await;
    let (status, body) = send(&app, "GET", "/metrics", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("cache_operations_total"));
}

#[tokio::test]
async fn test_import_accepts_multi_megabyte_snapshot() {
    let (app, responder) = app();
    let reply = "r".repeat(100 * 1024);
    for i in 0..30 {
        responder.cache().set(&format!("document {}", i), reply.clone(), None, None);
    }

    let (status, snapshot) = send(&app, "GET", "/cache/export", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(snapshot.len() > 2 * 1024 * 1024);

    responder.cache().clear();
    let (status, body) = send(&app, "POST", "/cache/import", snapshot).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["entries"], 30);
    assert!(responder.cache().has("document 7", None));
}
