//! Structured repository: the authoritative metadata graph.
//!
//! Owns identity and relationships for documents, folders, tags, goals and
//! annotations. Every component receives the repository explicitly; there is
//! no ambient session.

mod access;
mod schema;
mod sqlite;

pub use access::{RepositoryAccess, RepositoryGuard};
pub use schema::{create_schema, get_schema_version};
pub use sqlite::SqliteRepository;

use crate::db::OpenError;
use crate::domain::{Annotation, Document, DocumentId, Folder, FolderId, Goal};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the structured repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("document not found: {id}")]
    DocumentNotFound { id: DocumentId },

    #[error("folder not found: {id}")]
    FolderNotFound { id: FolderId },

    #[error("moving folder {id} would create a cycle")]
    FolderCycle { id: FolderId },

    #[error("folder {id} is not empty")]
    FolderNotEmpty { id: FolderId },

    #[error("document {id} already exists")]
    DuplicateDocument { id: DocumentId },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("invalid data in repository: {0}")]
    InvalidData(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage interface for the structured repository.
///
/// Saves are transactional: a call either applies completely or not at all.
pub trait DocumentRepository {
    // ===== Documents =====

    /// Inserts a new document.
    fn insert_document(&mut self, doc: &Document) -> RepositoryResult<()>;

    /// Overwrites an existing document, including its tags.
    fn save_document(&mut self, doc: &Document) -> RepositoryResult<()>;

    /// Saves several documents in one transaction.
    fn save_documents(&mut self, docs: &[Document]) -> RepositoryResult<()>;

    fn get_document(&self, id: &DocumentId) -> RepositoryResult<Option<Document>>;

    /// Lists documents ordered by identifier.
    fn list_documents(&self, include_trashed: bool) -> RepositoryResult<Vec<Document>>;

    /// Documents (trashed included) modified strictly after `since`.
    fn documents_modified_since(&self, since: DateTime<Utc>) -> RepositoryResult<Vec<Document>>;

    /// Documents whose identifier starts with `prefix` (case-insensitive).
    fn find_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<Document>>;

    /// Deletes a document with its tags, goals and annotations.
    ///
    /// Returns `false` if there was nothing to delete.
    fn delete_document(&mut self, id: &DocumentId) -> RepositoryResult<bool>;

    // ===== Folders =====

    fn insert_folder(&mut self, folder: &Folder) -> RepositoryResult<()>;

    /// Overwrites an existing folder, rejecting parent changes that would
    /// make the hierarchy cyclic.
    fn save_folder(&mut self, folder: &Folder) -> RepositoryResult<()>;

    fn get_folder(&self, id: &FolderId) -> RepositoryResult<Option<Folder>>;

    fn list_folders(&self) -> RepositoryResult<Vec<Folder>>;

    /// Deletes an empty folder.
    fn delete_folder(&mut self, id: &FolderId) -> RepositoryResult<()>;

    /// Saves a renamed or moved folder together with the new file paths of
    /// every affected document, in one transaction.
    fn apply_folder_change(
        &mut self,
        folder: &Folder,
        moved: &[(DocumentId, PathBuf)],
    ) -> RepositoryResult<()>;

    // ===== Goals and annotations =====

    fn add_goal(
        &mut self,
        document: &DocumentId,
        target_words: u32,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Goal>;

    fn goals_for(&self, document: &DocumentId) -> RepositoryResult<Vec<Goal>>;

    fn add_annotation(
        &mut self,
        document: &DocumentId,
        range: (u32, u32),
        text: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Annotation>;

    fn annotations_for(&self, document: &DocumentId) -> RepositoryResult<Vec<Annotation>>;

    // ===== Maintenance =====

    /// Writes a consistent copy of the repository to `target`.
    fn backup_to(&self, target: &Path) -> RepositoryResult<()>;
}
