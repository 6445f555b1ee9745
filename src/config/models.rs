//! Configuration data structures for the replycache service.
//!
//! This module defines the schema for the application settings: the HTTP
//! listener, the response cache bounds, the upstream chat backend and the
//! snapshot file used to persist the cache across restarts.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// Response cache bounds and sweep cadence.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream chat backend settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Snapshot persistence settings.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Bounds and behaviour of the response cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Hard cap on entry count before count-based eviction triggers.
    /// Default: `1000`
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Entry lifetime in milliseconds.
    /// Default: `1800000` (30 minutes)
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Soft cap on the estimated memory footprint, in megabytes.
    /// Default: `50`
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,

    /// Reserved for value compression. Accepted and exported, otherwise inert.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enable_compression: bool,

    /// Seconds between background TTL sweeps.
    /// Default: `300` (5 minutes)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Whether to seed the cache with canned greetings at startup.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub preload_greetings: bool,
}

/// Settings for the upstream chat backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Endpoint receiving `{ message, context }` and answering `{ response }`.
    /// Default: `http://127.0.0.1:9000/v1/respond`
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Optional bearer token sent with each call.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    /// Default: `60`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Settings for persisting the cache between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Whether to load at startup and save at shutdown.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Location of the snapshot file.
    /// Default: `~/.replycache/snapshot.json`
    #[serde(default = "default_snapshot_path")]
    pub path: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl CacheConfig {
    /// Memory ceiling in bytes.
    pub fn max_memory_bytes(&self) -> u64 {
        self.max_memory_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_ms: default_ttl_ms(),
            max_memory_mb: default_max_memory_mb(),
            enable_compression: true,
            sweep_interval_secs: default_sweep_interval(),
            preload_greetings: true,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_snapshot_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_entries() -> usize {
    1000
}

fn default_ttl_ms() -> u64 {
    30 * 60 * 1000
}

fn default_max_memory_mb() -> u64 {
    50
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:9000/v1/respond".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_snapshot_path() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".replycache")
        .join("snapshot.json")
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.ttl_ms, 1_800_000);
        assert_eq!(config.max_memory_mb, 50);
        assert!(config.enable_compression);
        assert_eq!(config.max_memory_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AppConfig = from_json(r#"{"cache": {"max_entries": 10}}"#);
        assert_eq!(config.cache.max_entries, 10);
        assert_eq!(config.cache.ttl_ms, 1_800_000);
        assert_eq!(config.server.port, 8080);
    }

    fn from_json(json: &str) -> AppConfig {
        serde_json::from_str(json).unwrap()
    }
}
