//! `worksync init [--sequential] [--pool-size N] [--timeout SECS]`

use anyhow::{Context, Result};
use clap::Args;

use worksync_core::{config, SyncConfig};

use super::home_dir;

/// Write `~/.worksync/config.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Fetch full works one after another instead of on a worker pool.
    #[arg(long)]
    pub sequential: bool,

    /// Number of retrieval workers.
    #[arg(long, value_name = "N", default_value_t = config::DEFAULT_POOL_SIZE)]
    pub pool_size: usize,

    /// Seconds to wait for a retrieval batch before reporting it partial.
    #[arg(long = "timeout", value_name = "SECS", default_value_t = config::DEFAULT_JOIN_TIMEOUT_SECS)]
    pub join_timeout_secs: u64,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let config = SyncConfig {
            threaded: !self.sequential,
            pool_size: self.pool_size,
            join_timeout_secs: self.join_timeout_secs,
        };
        let path = config::save_at(&home, &config).context("failed to write configuration")?;

        println!("✓ Wrote {}", path.display());
        if config.threaded {
            println!(
                "  {} workers, {}s join timeout",
                config.pool_size, config.join_timeout_secs
            );
        } else {
            println!("  sequential retrieval");
        }
        Ok(())
    }
}
