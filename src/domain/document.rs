//! Document entity, storage modes and the derived storage lifecycle.

use crate::domain::tag::normalize_tags;
use crate::domain::{DocumentId, FolderId, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Title used when a document has no usable title.
pub const UNTITLED: &str = "Untitled";

/// Status assigned to new documents.
pub const DEFAULT_STATUS: &str = "draft";

/// Where a document's content is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Content lives in the structured repository; the file is a projection.
    Repository,
    /// Content lives only in the file; the repository keeps metadata.
    File,
    /// Migration window: content is held by both, disk is preferred on read.
    Hybrid,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Repository => "repository",
            StorageMode::File => "file",
            StorageMode::Hybrid => "hybrid",
        }
    }

    /// True when the repository holds a copy of the content.
    pub fn repository_holds_content(&self) -> bool {
        matches!(self, StorageMode::Repository | StorageMode::Hybrid)
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repository" | "repository-only" => Ok(StorageMode::Repository),
            "file" | "file-only" => Ok(StorageMode::File),
            "hybrid" => Ok(StorageMode::Hybrid),
            other => Err(format!(
                "unknown storage mode '{}': expected repository, file, or hybrid",
                other
            )),
        }
    }
}

/// Lifecycle position of a document's storage.
///
/// `Unmaterialized → FileBacked → (RepositoryOnly | Hybrid) → Trashed → Purged`.
/// Derived from the document on demand, never persisted. `Purged` is only
/// ever reported by the purge operation itself since the record is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageState {
    Unmaterialized,
    FileBacked,
    RepositoryOnly,
    Hybrid,
    Trashed,
    Purged,
}

/// A single writing unit as held by the structured repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    title: String,
    content: String,
    word_count: u32,
    char_count: u32,
    folder: Option<FolderId>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    trashed_at: Option<DateTime<Utc>>,
    file_path: Option<PathBuf>,
    storage_mode: StorageMode,
    status: String,
    progress: f64,
    tags: Vec<Tag>,
}

impl Document {
    /// Creates an empty repository-mode document.
    ///
    /// A blank title becomes [`UNTITLED`].
    pub fn new(
        id: DocumentId,
        title: &str,
        folder: Option<FolderId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: normalize_title(title),
            content: String::new(),
            word_count: 0,
            char_count: 0,
            folder,
            created: now,
            modified: now,
            trashed_at: None,
            file_path: None,
            storage_mode: StorageMode::Repository,
            status: DEFAULT_STATUS.to_string(),
            progress: 0.0,
            tags: Vec::new(),
        }
    }

    /// Starts a builder for rehydrating a stored document.
    pub fn builder(id: DocumentId, title: &str, created: DateTime<Utc>) -> DocumentBuilder {
        DocumentBuilder {
            doc: Document::new(id, title, None, created),
            counts: None,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Content as stored in the repository.
    ///
    /// Empty for file-mode documents; use the content accessor to read what
    /// the user actually sees.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn word_count(&self) -> u32 {
        self.word_count
    }

    pub fn char_count(&self) -> u32 {
        self.char_count
    }

    /// The containing folder, `None` for the inbox (root level).
    pub fn folder(&self) -> Option<FolderId> {
        self.folder
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn is_trashed(&self) -> bool {
        self.trashed_at.is_some()
    }

    pub fn trashed_at(&self) -> Option<DateTime<Utc>> {
        self.trashed_at
    }

    /// Root-relative file path, set once the document is materialised.
    ///
    /// Points under the trash directory while the document is trashed.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Derives where this document sits in the storage lifecycle.
    pub fn storage_state(&self) -> StorageState {
        if self.is_trashed() {
            return StorageState::Trashed;
        }
        if self.file_path.is_none() {
            return StorageState::Unmaterialized;
        }
        match self.storage_mode {
            StorageMode::File => StorageState::FileBacked,
            StorageMode::Repository => StorageState::RepositoryOnly,
            StorageMode::Hybrid => StorageState::Hybrid,
        }
    }

    /// True when the document has no words and no characters.
    pub fn is_empty(&self) -> bool {
        self.char_count == 0
    }

    pub fn set_title(&mut self, title: &str, now: DateTime<Utc>) {
        self.title = normalize_title(title);
        self.modified = now;
    }

    /// Replaces the repository content and recomputes counts.
    pub fn set_content(&mut self, content: impl Into<String>, now: DateTime<Utc>) {
        self.content = content.into();
        self.word_count = count_words(&self.content);
        self.char_count = count_chars(&self.content);
        self.modified = now;
    }

    /// Records counts for content held elsewhere (file mode).
    pub fn record_counts_for(&mut self, content: &str) {
        self.word_count = count_words(content);
        self.char_count = count_chars(content);
    }

    /// Drops the repository copy of the content, keeping counts.
    pub fn clear_repository_content(&mut self) {
        self.content.clear();
    }

    pub fn set_folder(&mut self, folder: Option<FolderId>, now: DateTime<Utc>) {
        self.folder = folder;
        self.modified = now;
    }

    pub fn set_tags(&mut self, tags: Vec<Tag>, now: DateTime<Utc>) {
        self.tags = normalize_tags(tags);
        self.modified = now;
    }

    pub fn set_status(&mut self, status: &str, now: DateTime<Utc>) {
        self.status = status.trim().to_string();
        self.modified = now;
    }

    /// Stores an externally computed progress metric, clamped to `0.0..=1.0`.
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Records where the document's file now lives.
    ///
    /// Materialising or relocating a file is not an edit, so `modified` is untouched.
    pub fn set_file_path(&mut self, path: Option<PathBuf>) {
        self.file_path = path;
    }

    pub fn set_storage_mode(&mut self, mode: StorageMode) {
        self.storage_mode = mode;
    }

    /// Flags the document as trashed; `trash_path` is its file inside the trash.
    pub fn mark_trashed(&mut self, at: DateTime<Utc>, trash_path: Option<PathBuf>) {
        self.trashed_at = Some(at);
        self.file_path = trash_path;
    }

    /// Clears the trash flag; `path` is where the file was restored to.
    pub fn mark_restored(&mut self, path: Option<PathBuf>) {
        self.trashed_at = None;
        self.file_path = path;
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.title, self.id.prefix())
    }
}

/// Builder used by the repository to rehydrate stored documents.
pub struct DocumentBuilder {
    doc: Document,
    counts: Option<(u32, u32)>,
}

impl DocumentBuilder {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.doc.content = content.into();
        self
    }

    /// Stored counts; when omitted they are computed from the content.
    pub fn counts(mut self, words: u32, chars: u32) -> Self {
        self.counts = Some((words, chars));
        self
    }

    pub fn folder(mut self, folder: Option<FolderId>) -> Self {
        self.doc.folder = folder;
        self
    }

    pub fn modified(mut self, modified: DateTime<Utc>) -> Self {
        self.doc.modified = modified;
        self
    }

    pub fn trashed_at(mut self, trashed_at: Option<DateTime<Utc>>) -> Self {
        self.doc.trashed_at = trashed_at;
        self
    }

    pub fn file_path(mut self, path: Option<PathBuf>) -> Self {
        self.doc.file_path = path;
        self
    }

    pub fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.doc.storage_mode = mode;
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.doc.status = status.into();
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.doc.set_progress(progress);
        self
    }

    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        self.doc.tags = normalize_tags(tags);
        self
    }

    pub fn build(mut self) -> Document {
        let (words, chars) = self.counts.unwrap_or_else(|| {
            (
                count_words(&self.doc.content),
                count_chars(&self.doc.content),
            )
        });
        self.doc.word_count = words;
        self.doc.char_count = chars;
        self.doc
    }
}

/// Counts whitespace-separated words.
pub fn count_words(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Counts Unicode scalar values.
pub fn count_chars(text: &str) -> u32 {
    u32::try_from(text.chars().count()).unwrap_or(u32::MAX)
}

fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn doc() -> Document {
        Document::new(DocumentId::new(), "Notes", None, t0())
    }

    #[test]
    fn new_document_is_unmaterialized_repository_mode() {
        let d = doc();
        assert_eq!(d.storage_mode(), StorageMode::Repository);
        assert_eq!(d.storage_state(), StorageState::Unmaterialized);
        assert_eq!(d.status(), DEFAULT_STATUS);
        assert!(d.is_empty());
        assert!(!d.is_trashed());
    }

    #[test]
    fn blank_title_becomes_untitled() {
        let d = Document::new(DocumentId::new(), "  ", None, t0());
        assert_eq!(d.title(), UNTITLED);
    }

    #[test]
    fn set_content_updates_counts_and_modified() {
        let mut d = doc();
        let later = t0() + chrono::Duration::seconds(10);
        d.set_content("one two  three\nfour", later);
        assert_eq!(d.word_count(), 4);
        assert_eq!(d.char_count(), 19);
        assert_eq!(d.modified(), later);
    }

    #[test]
    fn char_count_counts_scalars_not_bytes() {
        assert_eq!(count_chars("héllo"), 5);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn storage_state_follows_mode_once_materialized() {
        let mut d = doc();
        d.set_file_path(Some(PathBuf::from("Notes.md")));
        assert_eq!(d.storage_state(), StorageState::RepositoryOnly);
        d.set_storage_mode(StorageMode::Hybrid);
        assert_eq!(d.storage_state(), StorageState::Hybrid);
        d.set_storage_mode(StorageMode::File);
        assert_eq!(d.storage_state(), StorageState::FileBacked);
    }

    #[test]
    fn trash_and_restore_keep_identity() {
        let mut d = doc();
        let id = d.id();
        d.mark_trashed(t0(), Some(PathBuf::from(".trash/Notes.md")));
        assert_eq!(d.storage_state(), StorageState::Trashed);
        assert_eq!(d.file_path(), Some(Path::new(".trash/Notes.md")));
        d.mark_restored(Some(PathBuf::from("Notes.md")));
        assert!(!d.is_trashed());
        assert_eq!(d.id(), id);
    }

    #[test]
    fn set_file_path_does_not_touch_modified() {
        let mut d = doc();
        d.set_file_path(Some(PathBuf::from("Notes.md")));
        assert_eq!(d.modified(), t0());
    }

    #[test]
    fn progress_is_clamped() {
        let mut d = doc();
        d.set_progress(1.7);
        assert_eq!(d.progress(), 1.0);
        d.set_progress(f64::NAN);
        assert_eq!(d.progress(), 0.0);
    }

    #[test]
    fn builder_computes_counts_when_missing() {
        let d = Document::builder(DocumentId::new(), "X", t0())
            .content("a b c")
            .build();
        assert_eq!(d.word_count(), 3);
    }

    #[test]
    fn builder_keeps_stored_counts() {
        let d = Document::builder(DocumentId::new(), "X", t0())
            .storage_mode(StorageMode::File)
            .counts(120, 700)
            .build();
        assert_eq!(d.word_count(), 120);
        assert_eq!(d.content(), "");
    }

    #[test]
    fn storage_mode_parses_aliases() {
        assert_eq!(
            "repository-only".parse::<StorageMode>().unwrap(),
            StorageMode::Repository
        );
        assert_eq!("FILE".parse::<StorageMode>().unwrap(), StorageMode::File);
        assert!("cloud".parse::<StorageMode>().is_err());
    }
}
