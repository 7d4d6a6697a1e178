//! `worksync list`: remote works as a table or JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use worksync_core::{quality, WorkRecord, WorkSummary};

use super::{join_identifiers, open_profile, title_of};

/// Arguments for `worksync list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Profile snapshot file.
    #[arg(long, value_name = "FILE")]
    pub profile: PathBuf,

    /// Only works created by this integration, unmerged.
    #[arg(long)]
    pub sourced: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct WorkRowJson {
    put_code: Option<u64>,
    title: Option<String>,
    year: Option<i32>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    identifiers: Vec<String>,
    source: Option<String>,
    last_modified: Option<String>,
    violations: Vec<&'static str>,
}

#[derive(Tabled)]
struct WorkTableRow {
    #[tabled(rename = "put-code")]
    put_code: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "year")]
    year: String,
    #[tabled(rename = "type")]
    work_type: String,
    #[tabled(rename = "identifiers")]
    identifiers: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "quality")]
    quality: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let (_transport, orchestrator) = open_profile(&self.profile)?;
        let works = if self.sourced {
            orchestrator.list_sourced_works()
        } else {
            orchestrator.list_all_works()
        }
        .context("failed to list remote works")?;

        if self.json {
            print_json(&works)?;
            return Ok(());
        }
        print_table(&works, orchestrator.source_identity(), self.sourced);
        Ok(())
    }
}

fn print_json(works: &[WorkSummary]) -> Result<()> {
    let rows: Vec<WorkRowJson> = works
        .iter()
        .map(|w| WorkRowJson {
            put_code: w.put_code.map(|pc| pc.0),
            title: w.title_text().map(str::to_owned),
            year: w.publication_year(),
            work_type: w.work_type.as_ref().map(|t| t.to_string()),
            identifiers: w.identifiers().iter().map(|id| id.to_string()).collect(),
            source: w.source_client_id().map(str::to_owned),
            last_modified: w.last_modified_date.map(|d| d.to_rfc3339()),
            violations: quality::validate(w).iter().map(|v| v.code()).collect(),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&rows).context("failed to serialize works JSON")?
    );
    Ok(())
}

fn print_table(works: &[WorkSummary], source_identity: &str, sourced: bool) {
    let scope = if sourced { "sourced" } else { "merged" };
    println!(
        "worksync v{} | {} | {} {} works",
        env!("CARGO_PKG_VERSION"),
        source_identity,
        works.len(),
        scope
    );
    if works.is_empty() {
        println!("No works on this profile.");
        return;
    }

    let rows: Vec<WorkTableRow> = works
        .iter()
        .map(|w| {
            let violations = quality::validate(w);
            let quality = if violations.is_empty() {
                "ok".green().to_string()
            } else {
                violations
                    .iter()
                    .map(|v| v.code())
                    .collect::<Vec<_>>()
                    .join(", ")
                    .red()
                    .to_string()
            };
            WorkTableRow {
                put_code: w.put_code.map(|pc| pc.to_string()).unwrap_or_default(),
                title: title_of(w),
                year: w
                    .publication_year()
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                work_type: w
                    .work_type
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                identifiers: join_identifiers(w.identifiers()),
                source: source_label(w.source_client_id(), source_identity),
                quality,
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if let Some(latest) = works.iter().filter_map(|w| w.last_modified_date).max() {
        println!("Last modified {}", format_age(latest));
    }
}

fn source_label(client_id: Option<&str>, source_identity: &str) -> String {
    match client_id {
        Some(id) if id == source_identity => "this integration".cyan().to_string(),
        Some(id) => id.to_string(),
        None => "owner".bright_black().to_string(),
    }
}

fn format_age(at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - at).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
