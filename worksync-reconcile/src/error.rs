//! Error types for worksync-reconcile.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use worksync_core::{ConfigError, WorkError};

/// HTTP-style code the remote service uses for conflicting writes.
pub const CONFLICT_CODE: u16 = 409;

/// Error payload reported by the remote profile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemoteError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
}

impl RemoteError {
    pub fn new(response_code: u16, developer_message: impl Into<String>) -> Self {
        Self {
            response_code: Some(response_code),
            developer_message: Some(developer_message.into()),
            ..Self::default()
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.response_code {
            Some(code) => write!(f, "{code}")?,
            None => write!(f, "unknown status")?,
        }
        if let Some(msg) = self
            .developer_message
            .as_deref()
            .or(self.user_message.as_deref())
        {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Failure of a call to the remote profile collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote service answered with an error payload.
    #[error("remote error {0}")]
    Remote(RemoteError),

    /// The remote service could not be reached or its answer could not be read.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    pub fn response_code(&self) -> Option<u16> {
        match self {
            TransportError::Remote(err) => err.response_code,
            TransportError::Unavailable(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.response_code() == Some(CONFLICT_CODE)
    }
}

/// All errors that can arise from reconciliation operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    InvalidWork(#[from] WorkError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A summary without a put-code cannot be fetched.
    #[error("summary has no put-code")]
    MissingPutCode,

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Profile snapshot could not be parsed.
    #[error("failed to parse profile snapshot at {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ReconcileError {
    /// Remote status code, when the failure came from the transport.
    pub fn response_code(&self) -> Option<u16> {
        match self {
            ReconcileError::Transport(err) => err.response_code(),
            _ => None,
        }
    }
}

/// Convenience constructor for [`ReconcileError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReconcileError {
    ReconcileError::Io {
        path: path.into(),
        source,
    }
}
