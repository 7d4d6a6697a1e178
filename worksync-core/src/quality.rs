//! Minimal-quality rules a work must meet before it is synchronized.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WorkError;
use crate::types::{Work, WorkRecord};

/// A failed quality rule. The string codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityViolation {
    IdentifiersContainerMissing,
    IdentifiersListEmpty,
    TitleMissing,
    PublicationDateMissing,
    PublicationYearMissing,
    TypeMissing,
}

impl QualityViolation {
    pub fn code(&self) -> &'static str {
        match self {
            QualityViolation::IdentifiersContainerMissing => "identifiers-container-missing",
            QualityViolation::IdentifiersListEmpty => "identifiers-list-empty",
            QualityViolation::TitleMissing => "title-missing",
            QualityViolation::PublicationDateMissing => "publication-date-missing",
            QualityViolation::PublicationYearMissing => "publication-year-missing",
            QualityViolation::TypeMissing => "type-missing",
        }
    }
}

impl fmt::Display for QualityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Run every rule and collect the violations. Empty when the work passes.
///
/// A title made only of whitespace counts as missing.
pub fn validate(work: &impl WorkRecord) -> BTreeSet<QualityViolation> {
    let mut out = BTreeSet::new();

    match work.external_identifiers() {
        None => {
            out.insert(QualityViolation::IdentifiersContainerMissing);
        }
        Some(ids) if ids.identifiers.is_empty() => {
            out.insert(QualityViolation::IdentifiersListEmpty);
        }
        Some(_) => {}
    }

    let has_title = work
        .title_text()
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false);
    if !has_title {
        out.insert(QualityViolation::TitleMissing);
    }

    match work.publication_date() {
        None => {
            out.insert(QualityViolation::PublicationDateMissing);
        }
        Some(date) if date.year.is_none() => {
            out.insert(QualityViolation::PublicationYearMissing);
        }
        Some(_) => {}
    }

    if work.work_type().is_none() {
        out.insert(QualityViolation::TypeMissing);
    }

    out
}

/// Strict form for full works: fails with the complete violation set.
pub fn ensure_valid(work: &Work) -> Result<(), WorkError> {
    let violations = validate(work);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(WorkError::Invalid { violations })
    }
}
