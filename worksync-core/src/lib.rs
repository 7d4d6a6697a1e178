//! worksync core library: work model, identifier matching, quality rules,
//! group merging and configuration.
//!
//! - [`types`]: works, summaries, groups and identifiers
//! - [`identifiers`]: identifier diff and up-to-date predicates
//! - [`quality`]: minimal-quality validation
//! - [`group`]: remote group merging
//! - [`config`]: `~/.worksync/config.yaml`
//! - [`error`]: [`WorkError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod group;
pub mod identifiers;
pub mod quality;
pub mod types;

pub use config::SyncConfig;
pub use error::{ConfigError, WorkError};
pub use identifiers::{IdentifierDiff, IdentifierMatch};
pub use quality::QualityViolation;
pub use types::{
    ActivitiesSummary, Contributor, ExternalIdType, ExternalIdentifier, GroupIdentifier,
    PublicationDate, PutCode, Relationship, Source, Visibility, Work, WorkExternalIdentifiers,
    WorkGroup, WorkRecord, WorkSummary, WorkTitle, WorkType,
};
