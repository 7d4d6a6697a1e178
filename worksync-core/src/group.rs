//! Collapse a remote work group into one canonical summary.

use crate::types::{
    ExternalIdType, ExternalIdentifier, Relationship, WorkExternalIdentifiers, WorkGroup,
    WorkSummary,
};

/// Merge `group` into a single summary.
///
/// Metadata comes from the first member (the remote service orders the
/// preferred one first). The identifier set is rebuilt from the group-level
/// identifiers, each tagged `self` with its type lower-cased. A group with
/// no members yields a summary carrying only those identifiers.
pub fn merge(group: &WorkGroup) -> WorkSummary {
    let donor = group.summaries.first().cloned().unwrap_or_default();
    let identifiers = group
        .identifiers
        .iter()
        .map(|gid| ExternalIdentifier {
            id: gid.id.clone(),
            id_type: ExternalIdType::from_value(&gid.id_type.to_lowercase()),
            relationship: Relationship::Own,
        })
        .collect::<Vec<_>>();

    WorkSummary {
        external_identifiers: Some(WorkExternalIdentifiers::from(identifiers)),
        ..donor
    }
}
