//! `worksync import`: what the local side should pick up from the profile.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use worksync_core::{Work, WorkRecord};
use worksync_reconcile::ImportReport;

use super::{join_identifiers, load_works, open_profile, title_of};

/// Arguments for `worksync import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Profile snapshot file.
    #[arg(long, value_name = "FILE")]
    pub profile: PathBuf,

    /// YAML list of local works.
    #[arg(long, value_name = "FILE")]
    pub works: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let local = load_works(&self.works)?;
        let (_transport, mut orchestrator) = open_profile(&self.profile)?;
        let report = orchestrator.import(&local).context("import failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize import JSON")?
            );
            return Ok(());
        }
        print_report(&report, &local);
        Ok(())
    }
}

fn print_report(report: &ImportReport, local: &[Work]) {
    println!(
        "✓ {} new works, {} identifier updates, {} invalid, {} failed",
        report.creations.len(),
        report.updates.len(),
        report.invalid.len(),
        report.failures.len()
    );
    if !report.complete {
        println!(
            "{}",
            "retrieval timed out; the report is partial".yellow()
        );
    }

    if !report.updates.is_empty() {
        println!("{}", "IDENTIFIER UPDATES".bold());
        for update in &report.updates {
            let title = local
                .get(update.local_index)
                .map(|w| title_of(w))
                .unwrap_or_default();
            println!(
                "  +  #{} {}: {}",
                update.local_index,
                title,
                join_identifiers(&update.identifiers)
            );
        }
    }

    if !report.creations.is_empty() {
        println!("{}", "NEW WORKS".bold());
        for work in &report.creations {
            println!(
                "  +  {} [{}]",
                title_of(work),
                join_identifiers(work.identifiers())
            );
        }
    }

    if !report.invalid.is_empty() {
        println!("{}", "INVALID".bold());
        for invalid in &report.invalid {
            let codes: Vec<&str> = invalid.violations.iter().map(|v| v.code()).collect();
            println!(
                "  ✗  {} {}: {}",
                invalid.put_code,
                title_of(&invalid.work),
                codes.join(", ").red()
            );
        }
    }

    if !report.failures.is_empty() {
        println!("{}", "FAILED".bold());
        for failure in &report.failures {
            println!("  ✗  {}: {}", failure.put_code, failure.error.red());
        }
    }
}
