// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{LotteryError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file (`path`, or the default location when `None`)
    /// 3. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            // Override with environment variables (e.g. ARK_LOTTERY_COMMON__HTTP_TIMEOUT)
            .add_source(
                Environment::with_prefix("ARK_LOTTERY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| LotteryError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| LotteryError::Config(e.to_string()))
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.common.retry.max_retry_count == 0 {
            return Err(LotteryError::Config(
                "common.retry.max_retry_count must be at least 1".to_string(),
            ));
        }
        let wait = self.common.retry.retry_wait_time;
        if !wait.is_finite() || wait < 0.0 || Duration::try_from_secs_f64(wait).is_err() {
            return Err(LotteryError::Config(format!(
                "common.retry.retry_wait_time must be a finite, non-negative number of seconds, got {}",
                wait
            )));
        }
        if self.common.http_timeout == 0 {
            return Err(LotteryError::Config(
                "common.http_timeout must be at least 1 second".to_string(),
            ));
        }
        if self.accounts.is_empty() {
            return Err(LotteryError::Config(
                "no account configured, check the [[accounts]] section".to_string(),
            ));
        }
        Ok(())
    }

    /// Enabled accounts with their 1-based position in `accounts`.
    pub fn enabled_accounts(&self) -> impl Iterator<Item = (usize, &AccountConfig)> {
        self.accounts
            .iter()
            .enumerate()
            .filter(|(_, account)| account.is_enabled())
            .map(|(idx, account)| (idx + 1, account))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ark-lottery")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
