// replycache - bounded, TTL-aware response cache for a chat assistant backend
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use replycache::cache::{preload, spawn_sweeper, ResponseCache};
use replycache::cli::Args;
use replycache::config::AppConfig;
use replycache::responder::CachedResponder;
use replycache::server::create_router;
use replycache::snapshot::SnapshotStore;
use replycache::upstream::HttpBackend;
use replycache::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_preload {
        config.cache.preload_greetings = false;
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting replycache v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the cache, restore the last snapshot, seed greetings
    let cache = Arc::new(ResponseCache::new(config.cache.clone()));
    let store = config
        .snapshot
        .enabled
        .then(|| SnapshotStore::new(&config.snapshot.path));
    if let Some(store) = &store {
        if let Err(e) = store.load(&cache).await {
            warn!("Starting with an empty cache: {}", e);
        }
    }
    if config.cache.preload_greetings {
        // Restored greetings keep their hit counts
        let missing: Vec<_> = preload::greetings()
            .filter(|(input, _)| !cache.has(input, None))
            .collect();
        cache.preload(missing);
    }
    info!(
        "Cache ready: {} entries (max {}, ttl {}ms, {}MB)",
        cache.len(),
        config.cache.max_entries,
        config.cache.ttl_ms,
        config.cache.max_memory_mb
    );

    // Phase 4: Background TTL sweep
    let sweeper = spawn_sweeper(
        cache.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs.max(1)),
    );

    // Phase 5: Build and start HTTP server
    let backend = HttpBackend::new(&config.upstream)?;
    info!("Upstream backend: {}", backend.url());
    let responder = Arc::new(CachedResponder::new(cache.clone(), backend));
    let app = create_router(responder);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Phase 7: Stop the sweeper and persist what we have
    sweeper.shutdown().await;
    if let Some(store) = &store {
        if let Err(e) = store.save(&cache).await {
            warn!("Failed to save cache snapshot: {}", e);
        }
    }

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
