//! `worksync purge`: delete every work this integration created.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{open_profile, save_profile};

/// Arguments for `worksync purge`.
#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Profile snapshot file.
    #[arg(long, value_name = "FILE")]
    pub profile: PathBuf,

    /// Delete without saving the profile.
    #[arg(long)]
    pub dry_run: bool,
}

impl PurgeArgs {
    pub fn run(self) -> Result<()> {
        let (transport, orchestrator) = open_profile(&self.profile)?;
        let result = orchestrator.delete_all_sourced_works();

        // Deletions before a failure are not rolled back, so keep them.
        if !self.dry_run {
            save_profile(&transport, &self.profile)?;
        }
        let deleted = result.context("purge stopped on a failed delete")?;

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        if deleted.is_empty() {
            println!("{prefix}✓ nothing to delete");
            return Ok(());
        }
        println!("{prefix}✓ deleted {} works", deleted.len());
        for put_code in deleted {
            println!("  ✗  {put_code}");
        }
        Ok(())
    }
}
