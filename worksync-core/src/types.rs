//! Domain types for the work reconciliation model.
//!
//! [`Work`] is the full record, [`WorkSummary`] its listing projection and
//! [`WorkGroup`] the remote cluster of summaries considered the same logical
//! work. All types are serializable via serde so profile snapshots and local
//! work lists can be stored as YAML or JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote-assigned stable key of a work record (the "put-code").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PutCode(pub u64);

impl fmt::Display for PutCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PutCode {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// External identifiers
// ---------------------------------------------------------------------------

/// Kind of an external identifier.
///
/// Values outside the known enumeration are kept verbatim (lower-cased) in
/// [`ExternalIdType::Other`] so that equality stays value-based.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExternalIdType {
    Doi,
    Handle,
    Eid,
    Isbn,
    Issn,
    Pmid,
    Pmc,
    Arxiv,
    Wosuid,
    Uri,
    Other(String),
}

impl ExternalIdType {
    /// Look up a lower-case wire value. Unknown values map to `Other`.
    pub fn from_value(value: &str) -> Self {
        match value {
            "doi" => Self::Doi,
            "handle" => Self::Handle,
            "eid" => Self::Eid,
            "isbn" => Self::Isbn,
            "issn" => Self::Issn,
            "pmid" => Self::Pmid,
            "pmc" => Self::Pmc,
            "arxiv" => Self::Arxiv,
            "wosuid" => Self::Wosuid,
            "uri" => Self::Uri,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Doi => "doi",
            Self::Handle => "handle",
            Self::Eid => "eid",
            Self::Isbn => "isbn",
            Self::Issn => "issn",
            Self::Pmid => "pmid",
            Self::Pmc => "pmc",
            Self::Arxiv => "arxiv",
            Self::Wosuid => "wosuid",
            Self::Uri => "uri",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for ExternalIdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ExternalIdType {
    fn from(s: String) -> Self {
        Self::from_value(&s.to_ascii_lowercase())
    }
}

impl From<&str> for ExternalIdType {
    fn from(s: &str) -> Self {
        Self::from_value(&s.to_ascii_lowercase())
    }
}

impl From<ExternalIdType> for String {
    fn from(t: ExternalIdType) -> Self {
        t.as_str().to_owned()
    }
}

/// Whether an identifier names the work itself or a work containing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Relationship {
    /// The work's own identifier (`self` on the wire).
    #[default]
    #[serde(rename = "self")]
    Own,
    #[serde(rename = "part-of")]
    PartOf,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::Own => write!(f, "self"),
            Relationship::PartOf => write!(f, "part-of"),
        }
    }
}

/// A typed, relationship-tagged key for a work.
///
/// Equality compares all three fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub id_type: ExternalIdType,
    #[serde(default)]
    pub relationship: Relationship,
}

impl ExternalIdentifier {
    pub fn new(
        id_type: ExternalIdType,
        id: impl Into<String>,
        relationship: Relationship,
    ) -> Self {
        Self {
            id: id.into(),
            id_type,
            relationship,
        }
    }

    /// Identifier with the `self` relationship.
    pub fn own(id_type: ExternalIdType, id: impl Into<String>) -> Self {
        Self::new(id_type, id, Relationship::Own)
    }
}

impl fmt::Display for ExternalIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id_type.as_str().to_uppercase(), self.id)?;
        if self.relationship == Relationship::PartOf {
            write!(f, " (part-of)")?;
        }
        Ok(())
    }
}

/// Container of a work's identifiers. An absent list deserializes as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkExternalIdentifiers {
    #[serde(default)]
    pub identifiers: Vec<ExternalIdentifier>,
}

impl From<Vec<ExternalIdentifier>> for WorkExternalIdentifiers {
    fn from(identifiers: Vec<ExternalIdentifier>) -> Self {
        Self { identifiers }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkTitle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl From<&str> for WorkTitle {
    fn from(s: &str) -> Self {
        Self {
            title: Some(s.to_owned()),
            subtitle: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PublicationDate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
}

impl PublicationDate {
    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }
}

/// Publication category.
///
/// Categories outside the known list are kept verbatim in
/// [`WorkType::Other`], so they compare and serialize by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkType {
    Book,
    BookChapter,
    BookReview,
    ConferenceAbstract,
    ConferencePaper,
    ConferencePoster,
    DataSet,
    Dissertation,
    JournalArticle,
    Report,
    WorkingPaper,
    Other(String),
}

impl WorkType {
    /// Look up a kebab-case wire value. Unknown values map to `Other`.
    pub fn from_value(value: &str) -> Self {
        match value {
            "book" => Self::Book,
            "book-chapter" => Self::BookChapter,
            "book-review" => Self::BookReview,
            "conference-abstract" => Self::ConferenceAbstract,
            "conference-paper" => Self::ConferencePaper,
            "conference-poster" => Self::ConferencePoster,
            "data-set" => Self::DataSet,
            "dissertation" => Self::Dissertation,
            "journal-article" => Self::JournalArticle,
            "report" => Self::Report,
            "working-paper" => Self::WorkingPaper,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Book => "book",
            Self::BookChapter => "book-chapter",
            Self::BookReview => "book-review",
            Self::ConferenceAbstract => "conference-abstract",
            Self::ConferencePaper => "conference-paper",
            Self::ConferencePoster => "conference-poster",
            Self::DataSet => "data-set",
            Self::Dissertation => "dissertation",
            Self::JournalArticle => "journal-article",
            Self::Report => "report",
            Self::WorkingPaper => "working-paper",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WorkType {
    fn from(s: String) -> Self {
        Self::from_value(&s)
    }
}

impl From<WorkType> for String {
    fn from(t: WorkType) -> Self {
        t.as_str().to_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    Public,
    Limited,
    RegisteredOnly,
    Private,
}

/// The integration that created a remote entry. Entries added by the
/// profile owner carry no client id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared view over Work / WorkSummary
// ---------------------------------------------------------------------------

/// Fields shared by full works and summaries; the comparison and quality
/// rules are written once against this view.
pub trait WorkRecord {
    fn put_code(&self) -> Option<PutCode>;
    fn title(&self) -> Option<&WorkTitle>;
    fn publication_date(&self) -> Option<&PublicationDate>;
    fn work_type(&self) -> Option<&WorkType>;
    fn external_identifiers(&self) -> Option<&WorkExternalIdentifiers>;

    fn title_text(&self) -> Option<&str> {
        self.title().and_then(|t| t.title.as_deref())
    }

    fn publication_year(&self) -> Option<i32> {
        self.publication_date().and_then(|d| d.year)
    }

    /// Identifier list, empty when the container is absent.
    fn identifiers(&self) -> &[ExternalIdentifier] {
        self.external_identifiers()
            .map(|e| e.identifiers.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Lightweight listing projection of a [`Work`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put_code: Option<PutCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<WorkTitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<PublicationDate>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_identifiers: Option<WorkExternalIdentifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_index: Option<String>,
}

impl WorkSummary {
    /// Client id of the integration that created this entry, if any.
    pub fn source_client_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.client_id.as_deref())
    }
}

impl WorkRecord for WorkSummary {
    fn put_code(&self) -> Option<PutCode> {
        self.put_code
    }
    fn title(&self) -> Option<&WorkTitle> {
        self.title.as_ref()
    }
    fn publication_date(&self) -> Option<&PublicationDate> {
        self.publication_date.as_ref()
    }
    fn work_type(&self) -> Option<&WorkType> {
        self.work_type.as_ref()
    }
    fn external_identifiers(&self) -> Option<&WorkExternalIdentifiers> {
        self.external_identifiers.as_ref()
    }
}

/// A full work record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Work {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put_code: Option<PutCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<WorkTitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<PublicationDate>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_identifiers: Option<WorkExternalIdentifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
}

impl Work {
    /// Project onto the summary shape, dropping secondary metadata.
    pub fn summary(&self) -> WorkSummary {
        WorkSummary {
            put_code: self.put_code,
            title: self.title.clone(),
            publication_date: self.publication_date.clone(),
            work_type: self.work_type.clone(),
            external_identifiers: self.external_identifiers.clone(),
            source: self.source.clone(),
            visibility: self.visibility,
            created_date: self.created_date,
            last_modified_date: self.last_modified_date,
            path: self.path.clone(),
            display_index: self.display_index.clone(),
        }
    }

    /// Copy of this work carrying `put_code` as its identity.
    pub fn with_put_code(&self, put_code: Option<PutCode>) -> Work {
        Work {
            put_code,
            ..self.clone()
        }
    }

    /// Copy of this work with its identifier container replaced.
    pub fn with_identifiers(&self, identifiers: Option<WorkExternalIdentifiers>) -> Work {
        Work {
            external_identifiers: identifiers,
            ..self.clone()
        }
    }
}

impl WorkRecord for Work {
    fn put_code(&self) -> Option<PutCode> {
        self.put_code
    }
    fn title(&self) -> Option<&WorkTitle> {
        self.title.as_ref()
    }
    fn publication_date(&self) -> Option<&PublicationDate> {
        self.publication_date.as_ref()
    }
    fn work_type(&self) -> Option<&WorkType> {
        self.work_type.as_ref()
    }
    fn external_identifiers(&self) -> Option<&WorkExternalIdentifiers> {
        self.external_identifiers.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Remote grouping
// ---------------------------------------------------------------------------

/// Group-level identifier as reported by the remote service. The type is a
/// raw string, usually upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupIdentifier {
    #[serde(rename = "type")]
    pub id_type: String,
    pub id: String,
}

/// Summaries the remote service considers the same logical work, preferred
/// member first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub identifiers: Vec<GroupIdentifier>,
    #[serde(default)]
    pub summaries: Vec<WorkSummary>,
}

/// Full remote snapshot of a profile's works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActivitiesSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub groups: Vec<WorkGroup>,
}

impl ActivitiesSummary {
    /// Every member put-code, independent of source, in group order.
    pub fn put_codes(&self) -> Vec<PutCode> {
        self.groups
            .iter()
            .flat_map(|g| g.summaries.iter())
            .filter_map(|s| s.put_code)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
