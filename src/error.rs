//! Crate-level error type and the failure taxonomy shared by every pass.

use crate::domain::DocumentId;
use crate::index::IndexError;
use crate::infra::{FileStoreError, PathError};
use crate::repository::RepositoryError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Broad failure category, independent of which store raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An expected file or record is absent.
    NotFound,
    /// Permission or disk failure.
    IoFailure,
    /// Two documents or files claim one identifier.
    IdentifierCollision,
    /// File content cannot be decoded.
    EncodingFailure,
    /// Repository and file content disagree.
    ConsistencyDrift,
    /// The root or a database is unavailable; the pass cannot run.
    Structural,
    /// Bad input, such as an ambiguous identifier or a folder cycle.
    Invalid,
    /// A multi-step change was rolled back.
    Aborted,
    /// A destructive operation was called without confirmation.
    NotConfirmed,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::IoFailure => "i/o failure",
            ErrorKind::IdentifierCollision => "identifier collision",
            ErrorKind::EncodingFailure => "encoding failure",
            ErrorKind::ConsistencyDrift => "consistency drift",
            ErrorKind::Structural => "structural failure",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Aborted => "aborted",
            ErrorKind::NotConfirmed => "not confirmed",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by [`Library`](crate::Library) operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("identifier prefix '{prefix}' matches {count} documents")]
    AmbiguousId { prefix: String, count: usize },

    #[error("identifier {id} is claimed by more than one file")]
    IdentifierCollision { id: DocumentId },

    #[error("document {id} differs between repository and file")]
    ContentDrift { id: DocumentId },

    #[error("folder change aborted: {reason}")]
    CascadeAborted { reason: String },

    #[error("{operation} requires confirmation")]
    NotConfirmed { operation: &'static str },

    #[error("safety backup failed: {0}")]
    BackupFailed(#[source] FileStoreError),

    #[error("{0}")]
    Invalid(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Files(#[from] FileStoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Path(#[from] PathError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps the error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DocumentNotFound(_) | Error::FolderNotFound(_) => ErrorKind::NotFound,
            Error::AmbiguousId { .. } | Error::Invalid(_) | Error::Path(_) => ErrorKind::Invalid,
            Error::IdentifierCollision { .. } => ErrorKind::IdentifierCollision,
            Error::ContentDrift { .. } => ErrorKind::ConsistencyDrift,
            Error::CascadeAborted { .. } => ErrorKind::Aborted,
            Error::NotConfirmed { .. } => ErrorKind::NotConfirmed,
            Error::BackupFailed(_) => ErrorKind::IoFailure,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Files(e) => file_kind(e),
            Error::Repository(e) => match e {
                RepositoryError::DocumentNotFound { .. } | RepositoryError::FolderNotFound { .. } => {
                    ErrorKind::NotFound
                }
                RepositoryError::DuplicateDocument { .. } => ErrorKind::IdentifierCollision,
                RepositoryError::FolderCycle { .. } | RepositoryError::FolderNotEmpty { .. } => {
                    ErrorKind::Invalid
                }
                _ => ErrorKind::Structural,
            },
            Error::Index(e) => match e {
                IndexError::Files(e) => file_kind(e),
                _ => ErrorKind::Structural,
            },
        }
    }
}

pub(crate) fn file_kind(err: &FileStoreError) -> ErrorKind {
    match err {
        FileStoreError::NotFound { .. } => ErrorKind::NotFound,
        FileStoreError::InvalidEncoding { .. } | FileStoreError::Parse { .. } => {
            ErrorKind::EncodingFailure
        }
        FileStoreError::RootUnavailable { .. } => ErrorKind::Structural,
        FileStoreError::OutsideRoot { .. } => ErrorKind::Invalid,
        _ => ErrorKind::IoFailure,
    }
}

/// A per-item failure recorded inside a pass report.
///
/// Item failures never abort the pass that collected them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    /// Document identifier or relative path the failure concerns.
    pub target: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ItemError {
    pub fn new(target: impl fmt::Display, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            target: target.to_string(),
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_files(target: impl fmt::Display, err: &FileStoreError) -> Self {
        Self::new(target, file_kind(err), err.to_string())
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.target, self.message, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn file_errors_map_to_taxonomy() {
        let missing = Error::Files(FileStoreError::NotFound {
            path: PathBuf::from("a.md"),
        });
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let encoding = Error::Files(FileStoreError::InvalidEncoding {
            path: PathBuf::from("a.md"),
            encoding: "UTF-16".into(),
        });
        assert_eq!(encoding.kind(), ErrorKind::EncodingFailure);
    }

    #[test]
    fn repository_cycle_is_invalid() {
        let err = Error::Repository(RepositoryError::FolderCycle {
            id: crate::domain::FolderId::new(),
        });
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn item_error_displays_target_and_kind() {
        let item = ItemError::new("Notes.md", ErrorKind::IoFailure, "disk full");
        assert_eq!(item.to_string(), "Notes.md: disk full (i/o failure)");
    }
}
