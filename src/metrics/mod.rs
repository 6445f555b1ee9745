// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    BACKEND_CALLS,
    BACKEND_DURATION,
    CACHE_OPERATIONS,
    CACHE_SIZE,
};

/// Helper to record cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_set() {
    CACHE_OPERATIONS.with_label_values(&["set"]).inc();
}

pub fn record_cache_expired(count: usize) {
    if count > 0 {
        CACHE_OPERATIONS.with_label_values(&["expired"]).inc_by(count as f64);
    }
}

/// `pressure` is `count` or `memory`
pub fn record_cache_eviction(pressure: &str, count: usize) {
    if count > 0 {
        let label = format!("evicted_{}", pressure);
        CACHE_OPERATIONS.with_label_values(&[label.as_str()]).inc_by(count as f64);
    }
}

pub fn update_cache_size(entries: usize, memory_bytes: u64) {
    CACHE_SIZE.with_label_values(&["entries"]).set(entries as f64);
    CACHE_SIZE.with_label_values(&["memory_bytes"]).set(memory_bytes as f64);
}

/// Helper to record upstream backend calls
pub fn record_backend_call(success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "error" };
    BACKEND_CALLS.with_label_values(&[outcome]).inc();
    BACKEND_DURATION.with_label_values(&[outcome]).observe(duration_secs);
}
