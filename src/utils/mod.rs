//! Utility functions and helpers for ark-lottery.
//!
//! This module provides cross-cutting concerns like structured logging,
//! credential scrubbing, and the fixed-budget retry executor.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and log-safety helpers.
//! - `retry`: Retry loop with a constant delay and pluggable response validation.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
