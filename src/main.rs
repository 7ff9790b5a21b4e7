// ark-lottery - Retry-tolerant batch client for reward and lottery endpoints
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use ark_lottery::cli::Args;
use ark_lottery::config::AppConfig;
use ark_lottery::metrics::gather_metrics;
use ark_lottery::runner;
use ark_lottery::utils::logging;
use clap::Parser;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(pool_size) = args.pool_size {
        config.common.multiprocessing_pool_size = pool_size;
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting ark-lottery v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Refuse to run with an unusable configuration
    config.validate()?;

    // Phase 4: Process accounts
    let reports = runner::run(&config, args.account.as_deref()).await;

    let unclean: Vec<_> = reports.iter().filter(|report| !report.is_clean()).collect();
    if unclean.is_empty() {
        info!("all {} account(s) completed without failures", reports.len());
    } else {
        for report in unclean {
            warn!(
                "account #{} ({}): {} failed request(s){}",
                report.index,
                report.name,
                report.failed,
                report
                    .aborted
                    .as_ref()
                    .map(|reason| format!(", stopped early: {}", reason))
                    .unwrap_or_default()
            );
        }
    }

    debug!("run metrics:\n{}", gather_metrics());

    Ok(())
}
