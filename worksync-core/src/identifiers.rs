//! External-identifier matching.
//!
//! [`diff`] partitions two identifier lists by membership; the predicates
//! built on it decide whether two records describe the same publication and
//! whether one of them is already up to date.

use crate::types::{ExternalIdentifier, WorkRecord};

/// Partition of `a ∪ b` by membership.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifierDiff {
    /// Present in both lists (taken from `a`).
    pub same: Vec<ExternalIdentifier>,
    /// Present only in `a`.
    pub less: Vec<ExternalIdentifier>,
    /// Present only in `b`.
    pub more: Vec<ExternalIdentifier>,
}

impl IdentifierDiff {
    /// No identifier differs in either direction.
    pub fn is_identical(&self) -> bool {
        self.less.is_empty() && self.more.is_empty()
    }
}

/// Symmetric difference of two identifier lists.
///
/// Duplicates are not collapsed, so a repeated identifier is counted once
/// per occurrence.
pub fn diff(a: &[ExternalIdentifier], b: &[ExternalIdentifier]) -> IdentifierDiff {
    let mut out = IdentifierDiff::default();
    for id in a {
        if b.contains(id) {
            out.same.push(id.clone());
        } else {
            out.less.push(id.clone());
        }
    }
    for id in b {
        if !a.contains(id) {
            out.more.push(id.clone());
        }
    }
    out
}

/// `incoming` carries at least one identifier that `existing` lacks.
pub fn has_new_identifiers(existing: &impl WorkRecord, incoming: &impl WorkRecord) -> bool {
    !diff(existing.identifiers(), incoming.identifiers())
        .more
        .is_empty()
}

/// Both records carry exactly the same identifiers.
pub fn is_identifiers_up_to_date(existing: &impl WorkRecord, incoming: &impl WorkRecord) -> bool {
    diff(existing.identifiers(), incoming.identifiers()).is_identical()
}

/// Title text, publication year and work type agree. Absent on both sides
/// counts as equal; absent on one side does not.
pub fn is_metadata_up_to_date(existing: &impl WorkRecord, incoming: &impl WorkRecord) -> bool {
    let same_title = match (existing.title(), incoming.title()) {
        (None, None) => true,
        (Some(_), Some(_)) => existing.title_text() == incoming.title_text(),
        _ => false,
    };
    let same_year = match (existing.publication_date(), incoming.publication_date()) {
        (None, None) => true,
        (Some(a), Some(b)) => a.year == b.year,
        _ => false,
    };
    same_title && same_year && existing.work_type() == incoming.work_type()
}

/// Identifiers and metadata both agree. Contributors are not compared.
pub fn is_up_to_date(existing: &impl WorkRecord, incoming: &impl WorkRecord) -> bool {
    is_identifiers_up_to_date(existing, incoming) && is_metadata_up_to_date(existing, incoming)
}

/// A candidate sharing at least one identifier with a reference record.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierMatch<'a, W> {
    /// Position of the candidate in the input slice.
    pub index: usize,
    pub work: &'a W,
    /// `diff(candidate, reference)`: `more` holds the reference's extra identifiers.
    pub diff: IdentifierDiff,
}

/// Diff every candidate against `reference` and keep those with a
/// non-empty `same` set.
pub fn matching_candidates<'a, W: WorkRecord>(
    reference: &impl WorkRecord,
    candidates: &'a [W],
) -> Vec<IdentifierMatch<'a, W>> {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(index, work)| {
            let diff = diff(work.identifiers(), reference.identifiers());
            if diff.same.is_empty() {
                None
            } else {
                Some(IdentifierMatch { index, work, diff })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExternalIdType, PublicationDate, Work, WorkTitle, WorkType};

    fn doi(id: &str) -> ExternalIdentifier {
        ExternalIdentifier::own(ExternalIdType::Doi, id)
    }

    fn work(ids: Vec<ExternalIdentifier>) -> Work {
        Work {
            title: Some(WorkTitle::from("T")),
            publication_date: Some(PublicationDate::year(2010)),
            work_type: Some(WorkType::JournalArticle),
            external_identifiers: Some(ids.into()),
            ..Work::default()
        }
    }

    #[test]
    fn diff_with_self_is_all_same() {
        let a = vec![doi("1"), doi("2")];
        let d = diff(&a, &a);
        assert_eq!(d.same, a);
        assert!(d.is_identical());
    }

    #[test]
    fn duplicates_are_counted() {
        let a = vec![doi("1"), doi("1")];
        let d = diff(&a, &[]);
        assert_eq!(d.less.len(), 2);
    }

    #[test]
    fn metadata_one_sided_title_is_unequal() {
        let a = work(vec![doi("1")]);
        let mut b = a.clone();
        b.title = None;
        assert!(!is_metadata_up_to_date(&a, &b));
        assert!(is_identifiers_up_to_date(&a, &b));
    }

    #[test]
    fn metadata_ignores_month_and_contributors() {
        let a = work(vec![doi("1")]);
        let mut b = a.clone();
        b.publication_date = Some(PublicationDate {
            year: Some(2010),
            month: Some(3),
            day: None,
        });
        b.contributors.push(crate::types::Contributor {
            name: "X".to_string(),
            orcid: None,
            role: None,
        });
        assert!(is_up_to_date(&a, &b));
    }

    #[test]
    fn candidates_without_shared_identifier_are_dropped() {
        let reference = work(vec![doi("1"), doi("2")]).summary();
        let candidates = vec![work(vec![doi("3")]), work(vec![doi("2")])];
        let found = matching_candidates(&reference, &candidates);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 1);
        assert_eq!(found[0].diff.more, vec![doi("1")]);
    }
}
