// CLI module for ark-lottery
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// ark-lottery - run the configured reward/lottery requests for every account
#[derive(Parser, Debug)]
#[command(name = "ark-lottery", version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file (default: ~/.ark-lottery/config.toml)
    #[arg(short, long, env = "ARK_LOTTERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override common.multiprocessing_pool_size
    #[arg(long)]
    pub pool_size: Option<i64>,

    /// Only run the account with this name
    #[arg(long)]
    pub account: Option<String>,
}
