//! Configuration data structures for ark-lottery.
//!
//! This module defines the schema for the application settings: shared
//! network/retry parameters, logging, and the list of accounts together
//! with the requests each account runs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::network::ResponseFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Settings shared by every account.
    #[serde(default)]
    pub common: CommonConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Accounts to process, in order.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Settings shared by every account's HTTP façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonConfig {
    /// Connect + read timeout for a single request attempt, in seconds.
    /// Default: `10`
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// Retry policy applied to every retryable request.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Run accounts concurrently instead of one after another.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enable_multiprocessing: bool,

    /// Number of accounts processed at the same time.
    /// `0` uses the number of logical CPU cores, `-1` one slot per enabled account.
    /// Default: `0`
    #[serde(default)]
    pub multiprocessing_pool_size: i64,
}

/// Fixed-budget, fixed-delay retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one. Must be at least 1.
    /// Default: `3`
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Seconds to wait between two failed attempts.
    /// Default: `5.0`
    #[serde(default = "default_retry_wait_time")]
    pub retry_wait_time: f64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `compact`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Mask `skey`/`p_skey` values in logged cookie strings.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub sanitize_tokens: bool,
}

/// One account and the requests it runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountConfig {
    /// Display name used in logs.
    #[serde(default)]
    pub name: String,

    /// Disabled accounts are skipped.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enable: bool,

    #[serde(default)]
    pub device_id: String,

    #[serde(default)]
    pub uin: String,

    #[serde(default)]
    pub skey: String,

    /// Requests executed in order for this account.
    #[serde(default)]
    pub requests: Vec<RequestConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// A single request in an account's workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Context label printed in front of the response log line.
    pub ctx: String,

    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Form-encoded body (POST only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<BTreeMap<String, String>>,

    /// JSON body (POST only). Ignored when `form` is also set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,

    #[serde(default)]
    pub format: ResponseFormat,

    /// Percent-decode values of malformed JSONP responses.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub need_unquote: bool,

    /// Make exactly one attempt and surface transport errors (POST only).
    #[serde(default)]
    pub disable_retry: bool,

    #[serde(default)]
    pub extra_cookies: String,

    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl RetryConfig {
    /// The inter-attempt delay as a `Duration`.
    ///
    /// Negative or NaN waits become zero, waits too large for a `Duration`
    /// saturate at `Duration::MAX`.
    pub fn wait_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_wait_time.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl CommonConfig {
    /// Resolve the configured pool size against the number of enabled accounts.
    pub fn pool_size(&self, enabled_accounts: usize) -> usize {
        match self.multiprocessing_pool_size {
            size if size > 0 => size as usize,
            -1 => enabled_accounts.max(1),
            _ => num_cpus::get(),
        }
    }
}

impl AccountConfig {
    pub fn is_enabled(&self) -> bool {
        self.enable
    }
}

// Default trait implementations linking to custom logic

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_http_timeout(),
            retry: RetryConfig::default(),
            enable_multiprocessing: true,
            multiprocessing_pool_size: 0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            retry_wait_time: default_retry_wait_time(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            sanitize_tokens: true,
        }
    }
}

// Helper functions for serde defaults
fn default_http_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_retry_count() -> u32 {
    3
}

fn default_retry_wait_time() -> f64 {
    5.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}
