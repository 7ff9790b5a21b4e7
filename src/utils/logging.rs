//! Structured logging and credential-scrubbing utilities.
//!
//! This module configures the `tracing` ecosystem for the application and
//! provides helpers to keep session keys out of log sinks, plus a way to
//! emit an event at a level chosen at runtime.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for log ingestion.
/// - `pretty`: Multi-line, human-readable output.
/// - `compact` (default): One line per event, easiest to follow when many
///   accounts log at the same time.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
    }

    Ok(())
}

/// Emits `message` at a level decided at runtime.
///
/// `tracing` macros need the level at compile time, so this dispatches to
/// the matching macro.
pub fn log_at(level: Level, message: &str) {
    if level == Level::ERROR {
        error!("{}", message);
    } else if level == Level::WARN {
        warn!("{}", message);
    } else if level == Level::INFO {
        info!("{}", message);
    } else if level == Level::DEBUG {
        debug!("{}", message);
    } else {
        trace!("{}", message);
    }
}

/// Masks session keys in cookie strings before they reach a log sink.
///
/// Every `skey=` assignment (which also covers `p_skey=`) has its value
/// replaced with `[REDACTED]`, up to the next `;`, whitespace, or quote.
pub fn sanitize(input: &str) -> String {
    const MARKER: &str = "skey=";

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(MARKER) {
        let value_start = pos + MARKER.len();
        result.push_str(&rest[..value_start]);

        let value = &rest[value_start..];
        let end = value
            .find(|c: char| c == ';' || c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(value.len());
        if end > 0 {
            result.push_str("[REDACTED]");
        }
        rest = &value[end..];
    }
    result.push_str(rest);

    result
}
