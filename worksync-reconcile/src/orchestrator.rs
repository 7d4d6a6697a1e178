//! Reconciliation orchestrator: the public surface over a remote profile.
//!
//! Every operation delegates to the [`Transport`] collaborator and surfaces
//! its failures unchanged as [`ReconcileError::Transport`]; nothing is
//! retried. Only batched full-work retrieval runs concurrently, on the
//! instance's [`RetrievalPool`]; the orchestrator itself is not meant to be
//! shared between callers without external synchronization.

use std::sync::Arc;

use worksync_core::{
    group, identifiers, ActivitiesSummary, IdentifierMatch, PutCode, SyncConfig, Work,
    WorkRecord, WorkSummary,
};

use crate::error::ReconcileError;
use crate::pool::{fetch_full_work, FetchBatch, RetrievalPool};
use crate::transport::Transport;

pub struct Orchestrator<T: Transport + 'static> {
    transport: Arc<T>,
    config: SyncConfig,
    pool: RetrievalPool<T>,
}

impl<T: Transport + 'static> Orchestrator<T> {
    pub fn new(transport: Arc<T>, config: SyncConfig) -> Result<Self, ReconcileError> {
        config.validate()?;
        let pool = RetrievalPool::new(Arc::clone(&transport), &config);
        Ok(Self {
            transport,
            config,
            pool,
        })
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn source_identity(&self) -> &str {
        self.transport.source_identity()
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    pub fn activities_summary(&self) -> Result<ActivitiesSummary, ReconcileError> {
        tracing::debug!("[getActivitiesSummary]");
        Ok(self.transport.fetch_activities()?)
    }

    /// Every remote group merged into one summary, independent of source.
    pub fn list_all_works(&self) -> Result<Vec<WorkSummary>, ReconcileError> {
        let activities = self.activities_summary()?;
        Ok(activities.groups.iter().map(group::merge).collect())
    }

    /// Remote summaries created by this integration. Entries with no source
    /// client (added by the profile owner) or a foreign one are left out.
    pub fn list_sourced_works(&self) -> Result<Vec<WorkSummary>, ReconcileError> {
        let source = self.source_identity();
        let activities = self.activities_summary()?;
        Ok(activities
            .groups
            .into_iter()
            .flat_map(|g| g.summaries)
            .filter(|s| s.source_client_id() == Some(source))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Delete every sourced work. Stops at the first failure; works already
    /// deleted stay deleted.
    pub fn delete_all_sourced_works(&self) -> Result<Vec<PutCode>, ReconcileError> {
        let mut deleted = Vec::new();
        for summary in self.list_sourced_works()? {
            let Some(put_code) = summary.put_code else {
                continue;
            };
            self.delete_work(put_code)?;
            deleted.push(put_code);
        }
        tracing::info!("deleted {} sourced works", deleted.len());
        Ok(deleted)
    }

    pub fn delete_work(&self, put_code: PutCode) -> Result<(), ReconcileError> {
        tracing::debug!("[deleteWork] {put_code}");
        Ok(self.transport.delete_work(put_code)?)
    }

    /// Submit a copy of `work` without its put-code; returns the assigned one.
    pub fn add_work(&self, work: &Work) -> Result<PutCode, ReconcileError> {
        tracing::debug!("[addWork] {}", work.title_text().unwrap_or("<untitled>"));
        let put_code = self.transport.add_work(&work.with_put_code(None))?;
        tracing::debug!("[addWork] {put_code}");
        Ok(put_code)
    }

    /// Submit a copy of `work` carrying `put_code`. The caller's value is
    /// never modified.
    pub fn update_work(&self, put_code: PutCode, work: &Work) -> Result<(), ReconcileError> {
        tracing::debug!("[updateWork] {put_code}");
        Ok(self
            .transport
            .update_work(put_code, &work.with_put_code(Some(put_code)))?)
    }

    // -----------------------------------------------------------------------
    // Full-work retrieval
    // -----------------------------------------------------------------------

    /// Fetch one full work as stored remotely.
    pub fn get_full_work(&self, put_code: PutCode) -> Result<Work, ReconcileError> {
        tracing::debug!("[getFullWork] {put_code}");
        Ok(self.transport.fetch_work(put_code)?)
    }

    /// Fetch the full work behind `summary`, taking the summary's identifiers
    /// and dropping the put-code, the same way the retrieval pool does.
    pub fn get_full_work_for(&self, summary: &WorkSummary) -> Result<Work, ReconcileError> {
        let put_code = summary.put_code.ok_or(ReconcileError::MissingPutCode)?;
        Ok(fetch_full_work(self.transport.as_ref(), put_code, summary)?)
    }

    /// Queue `summary` on the retrieval pool. Results are available from
    /// [`Orchestrator::wait_workers`].
    pub fn schedule_full_work(&mut self, summary: &WorkSummary) {
        self.pool.schedule(summary);
    }

    /// Join the retrieval pool within the configured timeout. A batch with
    /// `complete == false` is partial.
    pub fn wait_workers(&mut self) -> FetchBatch {
        let batch = self.pool.join(self.config.join_timeout());
        tracing::info!(
            "retrieved {} full works ({} failed)",
            batch.successes().count(),
            batch.failures().count()
        );
        batch
    }

    /// Schedule every summary and wait for the batch.
    pub fn get_full_works(&mut self, summaries: &[WorkSummary]) -> FetchBatch {
        for summary in summaries {
            self.schedule_full_work(summary);
        }
        self.wait_workers()
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    /// Candidates sharing at least one identifier with `summary`, each with
    /// `diff(candidate, summary)`.
    pub fn external_identifiers_diff<'a, W: WorkRecord>(
        summary: &WorkSummary,
        candidates: &'a [W],
    ) -> Vec<IdentifierMatch<'a, W>> {
        identifiers::matching_candidates(summary, candidates)
    }
}
