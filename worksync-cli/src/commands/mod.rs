//! Subcommands and the helpers they share.

pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod purge;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use worksync_core::{config, ExternalIdentifier, SyncConfig, Work, WorkRecord};
use worksync_reconcile::{MemoryTransport, Orchestrator};

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn load_config() -> Result<SyncConfig> {
    let home = home_dir()?;
    config::load_at(&home).with_context(|| {
        format!(
            "failed to load {}",
            config::config_path_at(&home).display()
        )
    })
}

/// Open the profile snapshot at `path` behind an orchestrator.
pub(crate) fn open_profile(
    path: &Path,
) -> Result<(Arc<MemoryTransport>, Orchestrator<MemoryTransport>)> {
    let transport = Arc::new(
        MemoryTransport::load(path)
            .with_context(|| format!("failed to load profile '{}'", path.display()))?,
    );
    let orchestrator = Orchestrator::new(Arc::clone(&transport), load_config()?)
        .context("invalid retrieval configuration")?;
    tracing::debug!(
        "opened profile {} as {}",
        path.display(),
        orchestrator.source_identity()
    );
    Ok((transport, orchestrator))
}

pub(crate) fn save_profile(transport: &MemoryTransport, path: &Path) -> Result<()> {
    transport
        .save(path)
        .with_context(|| format!("failed to save profile '{}'", path.display()))
}

/// Read a YAML list of local works.
pub(crate) fn load_works(path: &Path) -> Result<Vec<Work>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read works file '{}'", path.display()))?;
    let works: Vec<Work> = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse works file '{}'", path.display()))?;
    tracing::debug!("loaded {} local works from {}", works.len(), path.display());
    Ok(works)
}

pub(crate) fn title_of(work: &impl WorkRecord) -> String {
    worksync_reconcile::flows::display_title(work)
}

pub(crate) fn join_identifiers(ids: &[ExternalIdentifier]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
