//! `worksync export`: push local works to the profile.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use worksync_reconcile::{ExportReport, SyncStatus};

use super::{load_works, open_profile, save_profile, title_of};

/// Arguments for `worksync export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Profile snapshot file.
    #[arg(long, value_name = "FILE")]
    pub profile: PathBuf,

    /// YAML list of local works.
    #[arg(long, value_name = "FILE")]
    pub works: PathBuf,

    /// Run the export without saving the profile.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "code")]
    code: i32,
    #[tabled(rename = "put-code")]
    put_code: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl ExportArgs {
    pub fn run(self) -> Result<()> {
        let local = load_works(&self.works)?;
        let (transport, orchestrator) = open_profile(&self.profile)?;
        let result = orchestrator.export(&local);

        if !self.dry_run {
            save_profile(&transport, &self.profile)?;
        }
        let report = result.context("export failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize export JSON")?
            );
            return Ok(());
        }
        print_report(&report, &local, self.dry_run);
        Ok(())
    }
}

fn print_report(report: &ExportReport, local: &[worksync_core::Work], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}✓ exported {} works ({} added, {} updated, {} up to date, {} failed, {} deleted)",
        report.outcomes.len(),
        report.count(SyncStatus::AddOk),
        report.count(SyncStatus::UpdateOk),
        report.count(SyncStatus::UpToDate),
        report.outcomes.len()
            - report.count(SyncStatus::AddOk)
            - report.count(SyncStatus::UpdateOk)
            - report.count(SyncStatus::UpToDate),
        report.deleted.len()
    );

    if !report.outcomes.is_empty() {
        let rows: Vec<OutcomeRow> = report
            .outcomes
            .iter()
            .map(|o| OutcomeRow {
                index: o.index,
                title: local.get(o.index).map(|w| title_of(w)).unwrap_or_default(),
                status: status_label(o.status),
                code: o.status.code(),
                put_code: o.put_code.map(|pc| pc.to_string()).unwrap_or_default(),
                detail: match (&o.error, o.violations.is_empty()) {
                    (Some(err), _) => err.clone(),
                    (None, false) => o
                        .violations
                        .iter()
                        .map(|v| v.code())
                        .collect::<Vec<_>>()
                        .join(", "),
                    (None, true) => String::new(),
                },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    for put_code in &report.deleted {
        println!("  ✗  deleted remote work {put_code}");
    }
}

fn status_label(status: SyncStatus) -> String {
    let label = status.to_string();
    match status {
        SyncStatus::AddOk | SyncStatus::UpdateOk => label.green().to_string(),
        SyncStatus::UpToDate => label.bright_black().to_string(),
        SyncStatus::Conflict => label.yellow().to_string(),
        SyncStatus::ClientError | SyncStatus::Invalid => label.red().to_string(),
    }
}
