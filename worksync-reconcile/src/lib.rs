//! # worksync-reconcile
//!
//! Reconciliation of local works against a remote profile.
//!
//! Build an [`Orchestrator`] over any [`Transport`] and use its listing,
//! write and retrieval operations, or the batch flows
//! [`Orchestrator::export`] and [`Orchestrator::import`].
//! [`MemoryTransport`] is a complete in-memory profile.

pub mod error;
pub mod flows;
pub mod memory;
pub mod orchestrator;
pub mod pool;
pub mod transport;

pub use error::{ReconcileError, RemoteError, TransportError, CONFLICT_CODE};
pub use flows::{
    ExportOutcome, ExportReport, FetchFailure, IdentifierUpdate, ImportReport, InvalidImport,
    SyncStatus,
};
pub use memory::{Call, MemoryTransport, Operation, ProfileSnapshot};
pub use orchestrator::Orchestrator;
pub use pool::{FetchBatch, RetrievalPool};
pub use transport::Transport;
