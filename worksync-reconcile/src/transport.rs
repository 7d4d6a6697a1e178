//! Collaborator contract for the remote profile service.
//!
//! Wire details (HTTP verbs, tokens, payload encoding) live behind this
//! trait. Implementations surface failures as [`TransportError`] and never
//! retry.

use worksync_core::{ActivitiesSummary, PutCode, Work};

use crate::error::TransportError;

/// Operations the reconciliation engine needs from the remote profile.
///
/// Implementations must be safe to call from several fetch workers at once.
pub trait Transport: Send + Sync {
    /// Identifier this integration's writes are attributed to.
    fn source_identity(&self) -> &str;

    fn fetch_work(&self, put_code: PutCode) -> Result<Work, TransportError>;

    /// Create a work; `work.put_code` is expected to be absent.
    fn add_work(&self, work: &Work) -> Result<PutCode, TransportError>;

    fn update_work(&self, put_code: PutCode, work: &Work) -> Result<(), TransportError>;

    fn delete_work(&self, put_code: PutCode) -> Result<(), TransportError>;

    fn fetch_activities(&self) -> Result<ActivitiesSummary, TransportError>;
}
