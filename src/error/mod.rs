// Error types for ark-lottery
// Author: kelexine (https://github.com/kelexine)

use thiserror::Error;

/// Message the backend (and validators built on it) use for rate limiting.
/// Failures carrying it are expected and only logged at debug level.
pub const REQUEST_TOO_FAST: &str = "请求过快";

#[derive(Error, Debug)]
pub enum LotteryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response validator refused an otherwise successful transport call.
    #[error("{0}")]
    Rejected(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSONP error: {0}")]
    Jsonp(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LotteryError {
    pub fn rejected(message: impl Into<String>) -> Self {
        LotteryError::Rejected(message.into())
    }

    /// Rate-limit rejections are routine and should not be reported as errors.
    pub fn is_request_too_fast(&self) -> bool {
        self.to_string() == REQUEST_TOO_FAST
    }

    /// Operator-facing explanation for well-known transport failures.
    pub fn hint(&self) -> String {
        match self {
            LotteryError::Http(e) if e.is_timeout() => {
                "the request timed out; the network may be unstable, or common.http_timeout is too small".to_string()
            }
            LotteryError::Http(e) if e.is_connect() => {
                "could not connect to the server; check the network and any proxy settings".to_string()
            }
            LotteryError::Http(e) if e.is_decode() || e.is_body() => {
                "the response body could not be read completely".to_string()
            }
            LotteryError::Rejected(_) => "the response was rejected by its validator".to_string(),
            _ => String::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LotteryError>;
