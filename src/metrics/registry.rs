// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_int_counter_vec_with_registry, CounterVec,
    Encoder, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Process-local Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Transport attempts, including retries
    pub static ref HTTP_ATTEMPTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("http_attempts_total", "Total HTTP attempts made against the backend"),
        &["method", "outcome"], // method: get, post; outcome: ok, failed
        REGISTRY
    ).unwrap();

    /// Requests that used up their whole retry budget
    pub static ref RETRY_EXHAUSTED: IntCounterVec = register_int_counter_vec_with_registry!(
        Opts::new("retry_exhausted_total", "Requests that failed on every attempt"),
        &["method"],
        REGISTRY
    ).unwrap();

    /// Business-level verdicts of decoded payloads
    pub static ref BUSINESS_RESULTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("business_results_total", "Decoded responses by success verdict"),
        &["result"], // result: success, failure
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
