//! worksync: reconcile local bibliographic works with a remote profile.
//!
//! # Usage
//!
//! ```text
//! worksync init [--sequential] [--pool-size N] [--timeout SECS]
//! worksync list --profile <snapshot.yaml> [--sourced] [--json]
//! worksync export --profile <snapshot.yaml> --works <local.yaml> [--dry-run] [--json]
//! worksync import --profile <snapshot.yaml> --works <local.yaml> [--json]
//! worksync purge --profile <snapshot.yaml> [--dry-run]
//! ```
//!
//! The profile snapshot is a YAML dump of an in-memory remote profile; the
//! works file is a YAML list of local works.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    export::ExportArgs, import::ImportArgs, init::InitArgs, list::ListArgs, purge::PurgeArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "worksync",
    version,
    about = "Reconcile local bibliographic works with a remote researcher profile",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the retrieval pool configuration file.
    Init(InitArgs),

    /// List remote works, merged per group.
    List(ListArgs),

    /// Push local works to the remote profile.
    Export(ExportArgs),

    /// Compare the remote profile with local works and report what to pick up.
    Import(ImportArgs),

    /// Delete every remote work created by this integration.
    Purge(PurgeArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::List(args) => args.run(),
        Commands::Export(args) => args.run(),
        Commands::Import(args) => args.run(),
        Commands::Purge(args) => args.run(),
    }
}

/// Log records go to stderr so `--json` output stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
