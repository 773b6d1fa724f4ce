//! Core types: Document, Folder, Tag, identifiers (ULID), maintenance issues

mod annotation;
mod document;
mod folder;
mod ids;
mod issue;
mod stats;
mod tag;

pub use annotation::{Annotation, Goal};
pub use document::{
    DEFAULT_STATUS, Document, DocumentBuilder, StorageMode, StorageState, UNTITLED, count_chars,
    count_words,
};
pub use folder::{Folder, ParseFolderError};
pub use ids::{DocumentId, FolderId, ParseIdError};
pub use issue::{EntityRef, IssueFix, IssueKind, MaintenanceIssue, Severity};
pub use stats::{FileIntegrity, MigrationSummary, StorageStats, SyncStats};
pub use tag::{ParseTagError, Tag};
