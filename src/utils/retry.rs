// Fixed-budget retry executor for backend requests
// Author: kelexine (https://github.com/kelexine)

use crate::config::RetryConfig;
use crate::error::{LotteryError, Result};
use crate::metrics;
use crate::network::RawResponse;
use crate::utils::logging::log_at;
use backoff::backoff::{Backoff, Constant};
use std::backtrace::Backtrace;
use std::future::Future;
use tracing::{debug, error, Level};

/// Judges whether a transport-level success is also acceptable to the caller.
///
/// Returning `Some(error)` turns the attempt into a failure that is retried
/// exactly like a network error.
pub trait ResponseValidator: Send + Sync {
    fn validate(&self, response: &RawResponse) -> Option<LotteryError>;
}

impl<F> ResponseValidator for F
where
    F: Fn(&RawResponse) -> Option<LotteryError> + Send + Sync,
{
    fn validate(&self, response: &RawResponse) -> Option<LotteryError> {
        self(response)
    }
}

/// Validator used when the caller supplies none.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ResponseValidator for AcceptAll {
    fn validate(&self, _response: &RawResponse) -> Option<LotteryError> {
        None
    }
}

/// Execute `request_fn` up to `retry.max_retry_count` times.
///
/// `method` (`"get"`, `"post"`) only labels the attempt metrics.
/// - An attempt fails when the transport returns an error or `validator` objects.
/// - Failed attempts are separated by a constant `retry.retry_wait_time` delay;
///   nothing is slept after the last one.
/// - Returns the first accepted response, or `None` once the budget is spent.
///   The underlying error is logged, never returned.
pub async fn try_request<F, Fut>(
    operation_name: &str,
    method: &str,
    mut request_fn: F,
    retry: &RetryConfig,
    validator: &dyn ResponseValidator,
) -> Option<RawResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse>>,
{
    let mut delays = Constant::new(retry.wait_duration());

    for attempt in 1..=retry.max_retry_count {
        let outcome = match request_fn().await {
            Ok(response) => match validator.validate(&response) {
                Some(rejection) => Err(rejection),
                None => Ok(response),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => {
                metrics::record_attempt(method, true);
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Some(response);
            }
            Err(e) => {
                metrics::record_attempt(method, false);
                log_failed_attempt(operation_name, &e, attempt, retry);

                if attempt < retry.max_retry_count {
                    let delay = delays.next_backoff().unwrap_or_else(|| retry.wait_duration());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    metrics::record_retry_exhausted(method);
    error!(
        "{}: still failing after {} attempts, giving up",
        operation_name, retry.max_retry_count
    );
    None
}

fn log_failed_attempt(operation_name: &str, e: &LotteryError, attempt: u32, retry: &RetryConfig) {
    let benign = e.is_request_too_fast();
    let (summary_level, progress_level) = if benign {
        (Level::DEBUG, Level::DEBUG)
    } else {
        (Level::ERROR, Level::WARN)
    };

    let hint = e.hint();
    log_at(
        summary_level,
        &format!("{}: request failed: {} {}", operation_name, e, hint),
    );
    log_at(
        summary_level,
        &format!("full call stack=\n{}", Backtrace::force_capture()),
    );
    log_at(
        progress_level,
        &format!(
            "{}/{}: request failed, {} attempt(s) left, wait {}s. {}",
            attempt,
            retry.max_retry_count,
            retry.max_retry_count - attempt,
            retry.retry_wait_time,
            hint
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ok_response() -> RawResponse {
        RawResponse::new(200, "OK", "utf-8", r#"{"ret":0}"#)
    }

    #[test]
    fn test_closure_validator() {
        let reject_all = |_: &RawResponse| Some(LotteryError::rejected("nope"));
        assert!(reject_all.validate(&ok_response()).is_some());
        assert!(AcceptAll.validate(&ok_response()).is_none());
    }

    #[tokio::test]
    async fn test_zero_wait_single_attempt_success() {
        let calls = AtomicU32::new(0);
        let retry = RetryConfig {
            max_retry_count: 1,
            retry_wait_time: 0.0,
        };

        let result = try_request(
            "single",
            "get",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(ok_response()) }
            },
            &retry,
            &AcceptAll,
        )
        .await;

        assert!(result.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
