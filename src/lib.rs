// ark-lottery - Retry-tolerant batch client for reward and lottery endpoints
// Author: kelexine (https://github.com/kelexine)

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod runner;
pub mod utils;
