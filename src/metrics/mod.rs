// Metrics module for run statistics
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{gather_metrics, BUSINESS_RESULTS, HTTP_ATTEMPTS, RETRY_EXHAUSTED};

/// Helper to record a single transport attempt
pub fn record_attempt(method: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    HTTP_ATTEMPTS.with_label_values(&[method, outcome]).inc();
}

/// Helper to record a request whose retries all failed
pub fn record_retry_exhausted(method: &str) {
    RETRY_EXHAUSTED.with_label_values(&[method]).inc();
}

/// Helper to record the success verdict of a decoded response
pub fn record_business_result(success: bool) {
    let result = if success { "success" } else { "failure" };
    BUSINESS_RESULTS.with_label_values(&[result]).inc();
}
