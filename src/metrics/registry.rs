// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total response cache operations"),
        &["operation"], // operation: hit, miss, set, expired, evicted_count, evicted_memory
        REGISTRY
    ).unwrap();

    /// Current cache size
    pub static ref CACHE_SIZE: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_size_current", "Current response cache size"),
        &["measure"], // measure: entries, memory_bytes
        REGISTRY
    ).unwrap();

    // ============================================================================
    // BACKEND METRICS
    // ============================================================================

    /// Total upstream backend calls
    pub static ref BACKEND_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("backend_calls_total", "Total upstream backend calls"),
        &["outcome"], // outcome: success, error
        REGISTRY
    ).unwrap();

    /// Upstream backend call duration
    pub static ref BACKEND_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("backend_duration_seconds", "Upstream backend call duration")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["outcome"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
