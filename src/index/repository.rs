//! IndexStore trait and the index record type.

use crate::db::OpenError;
use crate::domain::{Document, DocumentId, Tag};
use crate::infra::{ContentHash, DocumentHeader, FileStoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the index store.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("invalid data in index: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Files(#[from] FileStoreError),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Denormalised document metadata kept for fast queries.
///
/// The index is a disposable cache: every record can be rebuilt from the
/// repository, or from the file tree alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    id: DocumentId,
    title: String,
    tags: Vec<Tag>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    progress: f64,
    status: String,
    path: Option<PathBuf>,
    folder: String,
    word_count: u32,
    char_count: u32,
    #[serde(serialize_with = "serialize_hash")]
    content_hash: Option<ContentHash>,
    trashed: bool,
    missing: bool,
}

impl IndexRecord {
    pub fn builder(
        id: DocumentId,
        title: impl Into<String>,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> IndexRecordBuilder {
        IndexRecordBuilder {
            record: IndexRecord {
                id,
                title: title.into(),
                tags: Vec::new(),
                created,
                modified,
                progress: 0.0,
                status: String::new(),
                path: None,
                folder: String::new(),
                word_count: 0,
                char_count: 0,
                content_hash: None,
                trashed: false,
                missing: false,
            },
        }
    }

    /// Record for a document as held by the repository.
    ///
    /// `folder` is the document's folder path (`""` at root) and `body_hash`
    /// the hash of the content the user sees.
    pub fn from_document(doc: &Document, folder: &str, body_hash: Option<ContentHash>) -> Self {
        Self::builder(doc.id(), doc.title(), doc.created(), doc.modified())
            .tags(doc.tags().to_vec())
            .progress(doc.progress())
            .status(doc.status())
            .path(doc.file_path().map(Path::to_path_buf))
            .folder(folder)
            .counts(doc.word_count(), doc.char_count())
            .content_hash(body_hash)
            .trashed(doc.is_trashed())
            .build()
    }

    /// Record rebuilt from a document file alone.
    pub fn from_file(header: &DocumentHeader, body: &str, path: &Path, trashed: bool) -> Self {
        let folder = if trashed {
            String::new()
        } else {
            folder_of(path)
        };
        Self::builder(header.id, header.title.clone(), header.created, header.modified)
            .tags(header.tags.clone())
            .status(header.status_or_default())
            .path(Some(path.to_path_buf()))
            .folder(folder)
            .counts(
                crate::domain::count_words(body),
                crate::domain::count_chars(body),
            )
            .content_hash(Some(ContentHash::of_text(body)))
            .trashed(trashed)
            .build()
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Relative file path, `None` while unmaterialised.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Folder path, `""` for root level.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn word_count(&self) -> u32 {
        self.word_count
    }

    pub fn char_count(&self) -> u32 {
        self.char_count
    }

    pub fn content_hash(&self) -> Option<&ContentHash> {
        self.content_hash.as_ref()
    }

    pub fn is_trashed(&self) -> bool {
        self.trashed
    }

    /// The recorded path does not exist on disk.
    pub fn is_missing(&self) -> bool {
        self.missing
    }

    /// Same record with the missing flag set.
    pub fn with_missing(mut self, missing: bool) -> Self {
        self.missing = missing;
        self
    }
}

/// Builder for [`IndexRecord`].
pub struct IndexRecordBuilder {
    record: IndexRecord,
}

impl IndexRecordBuilder {
    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        self.record.tags = tags;
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.record.progress = progress;
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.record.status = status.into();
        self
    }

    pub fn path(mut self, path: Option<PathBuf>) -> Self {
        self.record.path = path;
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.record.folder = folder.into();
        self
    }

    pub fn counts(mut self, words: u32, chars: u32) -> Self {
        self.record.word_count = words;
        self.record.char_count = chars;
        self
    }

    pub fn content_hash(mut self, hash: Option<ContentHash>) -> Self {
        self.record.content_hash = hash;
        self
    }

    pub fn trashed(mut self, trashed: bool) -> Self {
        self.record.trashed = trashed;
        self
    }

    pub fn missing(mut self, missing: bool) -> Self {
        self.record.missing = missing;
        self
    }

    pub fn build(self) -> IndexRecord {
        self.record
    }
}

/// Folder path of a root-relative file path, with `/` separators.
pub fn folder_of(path: &Path) -> String {
    path.parent().map(folder_string).unwrap_or_default()
}

/// A root-relative directory as a `/`-separated folder path.
pub fn folder_string(dir: &Path) -> String {
    dir.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn serialize_hash<S>(hash: &Option<ContentHash>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match hash {
        Some(h) => serializer.serialize_some(h.as_str()),
        None => serializer.serialize_none(),
    }
}

/// Storage interface for the index store.
///
/// Kept free of any repository types beyond the record itself so that the
/// reconciliation logic does not depend on the embedded database binding.
pub trait IndexStore {
    /// Inserts or replaces a record.
    fn upsert(&mut self, record: &IndexRecord) -> IndexResult<()>;

    /// Removes a record (idempotent). Returns `true` if one was removed.
    fn remove(&mut self, id: &DocumentId) -> IndexResult<bool>;

    fn get(&self, id: &DocumentId) -> IndexResult<Option<IndexRecord>>;

    /// Every record, trashed ones included.
    fn all_records(&self) -> IndexResult<Vec<IndexRecord>>;

    /// Non-trashed records ordered by folder then title.
    fn list_all(&self) -> IndexResult<Vec<IndexRecord>>;

    fn list_trashed(&self) -> IndexResult<Vec<IndexRecord>>;

    /// Non-trashed records directly inside `folder` (`""` for root level).
    fn list_in_folder(&self, folder: &str) -> IndexResult<Vec<IndexRecord>>;

    /// Distinct folder paths holding at least one non-trashed record.
    fn folders(&self) -> IndexResult<Vec<String>>;

    /// Case-insensitive match on title or tags over non-trashed records.
    fn search(&self, query: &str) -> IndexResult<Vec<IndexRecord>>;

    /// Sum of word counts over non-trashed records.
    fn aggregate_word_count(&self) -> IndexResult<u64>;

    fn set_missing(&mut self, id: &DocumentId, missing: bool) -> IndexResult<()>;

    /// Removes every record (sync state is kept).
    fn clear(&mut self) -> IndexResult<()>;

    /// Start time of the last completed sync pass.
    fn last_sync(&self) -> IndexResult<Option<DateTime<Utc>>>;

    fn set_last_sync(&mut self, at: DateTime<Utc>) -> IndexResult<()>;
}
