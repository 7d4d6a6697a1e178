//! Export and import batch flows.
//!
//! Both flows report a status per work instead of failing the whole batch,
//! so one rejected item does not stop the rest.
//!
//! Export states per local work: invalid (quality check failed, no remote
//! write), up to date, updated, added, or failed with a conflict / client
//! error. Import yields new identifiers for matched local works, full works
//! for unmatched remote entries, and the unmatched entries that fail the
//! quality rules.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use worksync_core::{
    group, identifiers, quality, PutCode, QualityViolation, Work, WorkError, WorkRecord,
    WorkSummary,
};

use crate::error::{ReconcileError, TransportError};
use crate::orchestrator::Orchestrator;
use crate::transport::Transport;

/// Per-work result of a batch flow. Numeric codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    AddOk,
    UpdateOk,
    UpToDate,
    Conflict,
    ClientError,
    Invalid,
}

impl SyncStatus {
    pub fn code(&self) -> i32 {
        match self {
            SyncStatus::AddOk => 200,
            SyncStatus::UpdateOk => 200,
            SyncStatus::UpToDate => 304,
            SyncStatus::Conflict => 409,
            SyncStatus::ClientError => 500,
            SyncStatus::Invalid => -11,
        }
    }

    /// Classify a failed write.
    pub fn from_error(err: &ReconcileError) -> Self {
        match err {
            ReconcileError::Transport(t) if t.is_conflict() => SyncStatus::Conflict,
            ReconcileError::InvalidWork(_) => SyncStatus::Invalid,
            _ => SyncStatus::ClientError,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::AddOk => "ADD_OK",
            SyncStatus::UpdateOk => "UPDATE_OK",
            SyncStatus::UpToDate => "UP_TO_DATE",
            SyncStatus::Conflict => "CONFLICT",
            SyncStatus::ClientError => "CLIENT_ERROR",
            SyncStatus::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    /// Position of the work in the local input.
    pub index: usize,
    pub status: SyncStatus,
    /// Remote put-code the work was added as, or matched to.
    pub put_code: Option<PutCode>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub violations: BTreeSet<QualityViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub outcomes: Vec<ExportOutcome>,
    /// Sourced remote works no local work matched, now deleted.
    pub deleted: Vec<PutCode>,
}

impl ExportReport {
    pub fn count(&self, status: SyncStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Identifiers a matched local work should gain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierUpdate {
    pub local_index: usize,
    pub put_code: Option<PutCode>,
    pub identifiers: Vec<worksync_core::ExternalIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidImport {
    pub put_code: PutCode,
    pub work: Work,
    pub violations: BTreeSet<QualityViolation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub put_code: PutCode,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Full works for remote entries no local work matches.
    pub creations: Vec<Work>,
    pub updates: Vec<IdentifierUpdate>,
    pub invalid: Vec<InvalidImport>,
    pub failures: Vec<FetchFailure>,
    /// Every scheduled retrieval finished before the join deadline.
    pub complete: bool,
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

impl<T: Transport + 'static> Orchestrator<T> {
    /// Push `local_works` to the remote profile.
    ///
    /// Sourced remote works matching no local work are deleted first; a
    /// failure there aborts the flow. Afterwards each local work is checked,
    /// then left alone, updated or added; per-item failures are reported in
    /// its outcome.
    pub fn export(&self, local_works: &[Work]) -> Result<ExportReport, ReconcileError> {
        let remote = self.list_sourced_works()?;
        let mut paired: Vec<Option<&WorkSummary>> = vec![None; local_works.len()];
        let mut report = ExportReport::default();

        for summary in &remote {
            let matched = Self::external_identifiers_diff(summary, local_works)
                .into_iter()
                .find(|m| paired[m.index].is_none());
            match matched {
                Some(m) => paired[m.index] = Some(summary),
                None => {
                    if let Some(put_code) = summary.put_code {
                        self.delete_work(put_code)?;
                        report.deleted.push(put_code);
                    }
                }
            }
        }

        for (index, work) in local_works.iter().enumerate() {
            let remote = paired[index];
            let outcome = self.export_one(index, work, remote);
            if let Some(err) = &outcome.error {
                tracing::warn!("export of work #{index} failed ({}): {err}", outcome.status);
            }
            report.outcomes.push(outcome);
        }

        tracing::info!(
            "export: {} added, {} updated, {} up to date, {} invalid, {} deleted",
            report.count(SyncStatus::AddOk),
            report.count(SyncStatus::UpdateOk),
            report.count(SyncStatus::UpToDate),
            report.count(SyncStatus::Invalid),
            report.deleted.len()
        );
        Ok(report)
    }

    fn export_one(&self, index: usize, work: &Work, remote: Option<&WorkSummary>) -> ExportOutcome {
        let matched_put_code = remote.and_then(|r| r.put_code);
        let mut outcome = ExportOutcome {
            index,
            status: SyncStatus::UpToDate,
            put_code: matched_put_code,
            violations: BTreeSet::new(),
            error: None,
        };

        if let Err(WorkError::Invalid { violations }) = quality::ensure_valid(work) {
            outcome.status = SyncStatus::Invalid;
            outcome.violations = violations;
            return outcome;
        }

        let result = match (remote, matched_put_code) {
            (Some(remote), Some(_)) if identifiers::is_up_to_date(work, remote) => return outcome,
            (Some(_), Some(put_code)) => self
                .update_work(put_code, work)
                .map(|()| (SyncStatus::UpdateOk, put_code)),
            _ => self.add_work(work).map(|pc| (SyncStatus::AddOk, pc)),
        };

        match result {
            Ok((status, put_code)) => {
                outcome.status = status;
                outcome.put_code = Some(put_code);
            }
            Err(err) => {
                outcome.status = SyncStatus::from_error(&err);
                outcome.error = Some(err.to_string());
            }
        }
        outcome
    }

    /// Compare the remote profile against `local_works` and collect what
    /// the local side should pick up. Nothing is written remotely.
    pub fn import(&mut self, local_works: &[Work]) -> Result<ImportReport, ReconcileError> {
        let activities = self.activities_summary()?;
        let mut report = ImportReport::default();
        let mut pending: Vec<(PutCode, BTreeSet<QualityViolation>)> = Vec::new();

        for merged in activities.groups.iter().map(group::merge) {
            let matches = Self::external_identifiers_diff(&merged, local_works);
            if matches.is_empty() {
                let Some(put_code) = merged.put_code else {
                    continue;
                };
                pending.push((put_code, quality::validate(&merged)));
                self.schedule_full_work(&merged);
                continue;
            }
            for m in matches {
                if identifiers::has_new_identifiers(m.work, &merged) {
                    report.updates.push(IdentifierUpdate {
                        local_index: m.index,
                        put_code: merged.put_code,
                        identifiers: m.diff.more,
                    });
                }
            }
        }

        let mut batch = self.wait_workers();
        report.complete = batch.complete;
        for (put_code, violations) in pending {
            match batch.works.remove(&put_code) {
                Some(Ok(work)) if violations.is_empty() => report.creations.push(work),
                Some(Ok(work)) => report.invalid.push(InvalidImport {
                    put_code,
                    work,
                    violations,
                }),
                Some(Err(err)) => report.failures.push(fetch_failure(put_code, &err)),
                None => report.failures.push(FetchFailure {
                    put_code,
                    error: "retrieval did not finish before the join timeout".to_string(),
                }),
            }
        }

        tracing::info!(
            "import: {} new works, {} identifier updates, {} invalid, {} failed",
            report.creations.len(),
            report.updates.len(),
            report.invalid.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Put-codes of every remote member, sourced or not, in group order.
    pub fn summary_put_codes(&self) -> Result<Vec<PutCode>, ReconcileError> {
        Ok(self.activities_summary()?.put_codes())
    }
}

fn fetch_failure(put_code: PutCode, err: &TransportError) -> FetchFailure {
    FetchFailure {
        put_code,
        error: err.to_string(),
    }
}

/// Title of a work for reports, or a placeholder.
pub fn display_title(work: &impl WorkRecord) -> String {
    work.title_text()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("<untitled>")
        .to_string()
}
