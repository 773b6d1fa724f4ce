//! Maintenance issue types.
//!
//! An issue describes drift between the structured repository, the file tree
//! and the index store. Each one knows its severity and, when a safe repair
//! exists, which fix to apply.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::domain::{DocumentId, FolderId};

/// Severity of a maintenance issue, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// The entity an issue is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "ref", rename_all = "snake_case")]
pub enum EntityRef {
    Document(DocumentId),
    File(PathBuf),
    IndexRecord(DocumentId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Document(id) => write!(f, "document {}", id.prefix()),
            EntityRef::File(path) => write!(f, "{}", path.display()),
            EntityRef::IndexRecord(id) => write!(f, "index record {}", id.prefix()),
        }
    }
}

/// The anomaly an issue reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// A file under the root whose identifier matches no document.
    /// `id` is `None` when the file carries no readable identifier at all.
    OrphanedFile {
        path: PathBuf,
        id: Option<DocumentId>,
    },
    /// A document records a file path that does not exist, but the
    /// repository still holds its content.
    MissingFile { id: DocumentId, path: PathBuf },
    /// Several files claim the same identifier.
    DuplicateIdentifier { id: DocumentId, paths: Vec<PathBuf> },
    /// Neither the repository nor any file holds the document's content.
    NoStorage { id: DocumentId },
    /// A document points at a folder that does not exist.
    BrokenFolderReference { id: DocumentId, folder: FolderId },
    /// A trashed document whose trash file is gone (`id` set), or a file in
    /// the trash that belongs to no trashed document (`id` unset).
    DanglingTrashEntry {
        path: PathBuf,
        id: Option<DocumentId>,
        recoverable: bool,
    },
    /// The index record is absent or older than the document.
    StaleIndexRecord { id: DocumentId },
    /// The index record matches neither a document nor a file.
    OrphanedIndexRecord { id: DocumentId },
    /// Hybrid document whose repository and file content disagree.
    ContentDrift { id: DocumentId, path: PathBuf },
    /// A file that cannot be decoded.
    UnreadableFile { path: PathBuf, message: String },
}

/// A repair the maintenance engine knows how to apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IssueFix {
    /// Write the file again from repository content.
    RematerializeFile { id: DocumentId },
    /// Write a trashed document's file back into the trash.
    RestoreTrashFile { id: DocumentId },
    /// Rebuild the index record from the repository and file state.
    RefreshIndexRecord { id: DocumentId },
    /// Drop an index record that refers to nothing.
    RemoveIndexRecord { id: DocumentId },
    /// Move a document with a broken folder reference to root level.
    PromoteToRoot { id: DocumentId },
    /// Settle a repository/file disagreement by the timestamp tie-break.
    ResolveDrift { id: DocumentId },
}

impl IssueFix {
    /// True for fixes that cannot lose data and are safe to apply unattended.
    pub fn is_safe(&self) -> bool {
        !matches!(self, IssueFix::ResolveDrift { .. })
    }
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::DuplicateIdentifier { .. } | IssueKind::NoStorage { .. } => {
                Severity::Critical
            }
            IssueKind::MissingFile { .. } => Severity::High,
            IssueKind::BrokenFolderReference { .. }
            | IssueKind::ContentDrift { .. }
            | IssueKind::UnreadableFile { .. }
            | IssueKind::OrphanedFile { .. } => Severity::Medium,
            IssueKind::DanglingTrashEntry { .. }
            | IssueKind::StaleIndexRecord { .. }
            | IssueKind::OrphanedIndexRecord { .. } => Severity::Low,
        }
    }

    pub fn subject(&self) -> EntityRef {
        match self {
            IssueKind::OrphanedFile { path, .. }
            | IssueKind::UnreadableFile { path, .. }
            | IssueKind::DanglingTrashEntry { path, id: None, .. } => EntityRef::File(path.clone()),
            IssueKind::MissingFile { id, .. }
            | IssueKind::DuplicateIdentifier { id, .. }
            | IssueKind::NoStorage { id }
            | IssueKind::BrokenFolderReference { id, .. }
            | IssueKind::ContentDrift { id, .. }
            | IssueKind::DanglingTrashEntry { id: Some(id), .. } => EntityRef::Document(*id),
            IssueKind::StaleIndexRecord { id } | IssueKind::OrphanedIndexRecord { id } => {
                EntityRef::IndexRecord(*id)
            }
        }
    }

    /// The repair for this issue, if one exists.
    ///
    /// Destructive actions (deleting orphaned or dangling files) are never
    /// offered here; they go through the confirmed operations on `Library`.
    pub fn fix(&self) -> Option<IssueFix> {
        match self {
            IssueKind::MissingFile { id, .. } => Some(IssueFix::RematerializeFile { id: *id }),
            IssueKind::BrokenFolderReference { id, .. } => Some(IssueFix::PromoteToRoot { id: *id }),
            IssueKind::StaleIndexRecord { id } => Some(IssueFix::RefreshIndexRecord { id: *id }),
            IssueKind::OrphanedIndexRecord { id } => Some(IssueFix::RemoveIndexRecord { id: *id }),
            IssueKind::ContentDrift { id, .. } => Some(IssueFix::ResolveDrift { id: *id }),
            IssueKind::DanglingTrashEntry {
                id: Some(id),
                recoverable: true,
                ..
            } => Some(IssueFix::RestoreTrashFile { id: *id }),
            _ => None,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::OrphanedFile { path, id: Some(id) } => write!(
                f,
                "orphaned file {} (claims unknown id {})",
                path.display(),
                id.prefix()
            ),
            IssueKind::OrphanedFile { path, id: None } => {
                write!(f, "orphaned file {} (no identifier)", path.display())
            }
            IssueKind::MissingFile { id, path } => write!(
                f,
                "missing file {} for document {}",
                path.display(),
                id.prefix()
            ),
            IssueKind::DuplicateIdentifier { id, paths } => {
                let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(
                    f,
                    "duplicate identifier {} in {}",
                    id.prefix(),
                    joined.join(", ")
                )
            }
            IssueKind::NoStorage { id } => write!(
                f,
                "document {} has no content in the repository and no readable file",
                id.prefix()
            ),
            IssueKind::BrokenFolderReference { id, folder } => write!(
                f,
                "document {} references missing folder {}",
                id.prefix(),
                folder.prefix()
            ),
            IssueKind::DanglingTrashEntry {
                path, id: Some(id), ..
            } => write!(
                f,
                "trashed document {} is missing its trash file {}",
                id.prefix(),
                path.display()
            ),
            IssueKind::DanglingTrashEntry { path, id: None, .. } => write!(
                f,
                "trash file {} belongs to no trashed document",
                path.display()
            ),
            IssueKind::StaleIndexRecord { id } => {
                write!(f, "index record for {} is out of date", id.prefix())
            }
            IssueKind::OrphanedIndexRecord { id } => write!(
                f,
                "index record {} has no document and no file",
                id.prefix()
            ),
            IssueKind::ContentDrift { id, path } => write!(
                f,
                "document {} differs from {}",
                id.prefix(),
                path.display()
            ),
            IssueKind::UnreadableFile { path, message } => {
                write!(f, "unreadable file {}: {}", path.display(), message)
            }
        }
    }
}

/// A maintenance finding, ready for display or serialisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MaintenanceIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub subject: EntityRef,
    pub description: String,
    pub can_auto_fix: bool,
    pub fix: Option<IssueFix>,
}

impl MaintenanceIssue {
    pub fn new(kind: IssueKind) -> Self {
        let fix = kind.fix();
        Self {
            severity: kind.severity(),
            subject: kind.subject(),
            description: kind.to_string(),
            can_auto_fix: fix.as_ref().is_some_and(IssueFix::is_safe),
            fix,
            kind,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl fmt::Display for MaintenanceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.description)
    }
}
