//! Rebuilds the index store from the file tree alone.

use crate::domain::DocumentId;
use crate::index::{IndexRecord, IndexResult, IndexStore};
use crate::infra::{FileStore, FileStoreError};
use crate::progress::{ItemOutcome, NoopReporter, ProgressReporter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ===========================================
// BuildError Type
// ===========================================

/// Errors that can occur when indexing individual files.
#[derive(Debug)]
pub enum BuildError {
    /// Front-matter missing or invalid; the file carries no identifier.
    Parse { path: PathBuf, message: String },
    /// I/O error reading the file.
    Io { path: PathBuf, message: String },
    /// Encoding error (UTF-16, invalid UTF-8, lone CR).
    Encoding { path: PathBuf, message: String },
}

impl BuildError {
    fn from_store(err: FileStoreError, path: &Path) -> Self {
        let path = path.to_path_buf();
        let message = err.to_string();
        match err {
            FileStoreError::Parse { .. } => BuildError::Parse { path, message },
            FileStoreError::InvalidEncoding { .. } => BuildError::Encoding { path, message },
            _ => BuildError::Io { path, message },
        }
    }

    /// Returns the path of the file that caused the error.
    pub fn path(&self) -> &Path {
        match self {
            BuildError::Parse { path, .. }
            | BuildError::Io { path, .. }
            | BuildError::Encoding { path, .. } => path,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BuildError::Parse { message, .. }
            | BuildError::Io { message, .. }
            | BuildError::Encoding { message, .. } => message,
        }
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path().display(), self.message())
    }
}

impl std::error::Error for BuildError {}

// ===========================================
// Result Type
// ===========================================

/// Result of rebuilding the index from files.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Number of records written.
    pub indexed: usize,
    /// Identifiers claimed by more than one file, with every claiming path.
    pub duplicates: HashMap<DocumentId, Vec<PathBuf>>,
    /// Files that could not be indexed.
    pub errors: Vec<BuildError>,
}

// ===========================================
// IndexBuilder
// ===========================================

/// Rebuilds an index store by scanning every document file, live and
/// trashed, and reading identifiers from front-matter.
///
/// This never consults the structured repository, so the index stays
/// reconstructable when the repository is gone.
pub struct IndexBuilder<'a> {
    files: &'a FileStore,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(files: &'a FileStore) -> Self {
        Self { files }
    }

    /// Clears the index and re-indexes every file.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be scanned or a database write
    /// fails. Individual file errors are collected in the result.
    pub fn rebuild_from_files<I: IndexStore + ?Sized>(
        &self,
        index: &mut I,
    ) -> IndexResult<BuildResult> {
        self.rebuild_with_progress(index, &mut NoopReporter)
    }

    pub fn rebuild_with_progress<I, P>(
        &self,
        index: &mut I,
        progress: &mut P,
    ) -> IndexResult<BuildResult>
    where
        I: IndexStore + ?Sized,
        P: ProgressReporter + ?Sized,
    {
        let live = self.files.list_all_document_files()?;
        let trashed = self.files.list_trash_files()?;
        progress.on_start("rebuilding index", live.len() + trashed.len());

        index.clear()?;

        let mut result = BuildResult::default();
        let mut claimed: HashMap<DocumentId, PathBuf> = HashMap::new();
        let files = live
            .into_iter()
            .map(|p| (p, false))
            .chain(trashed.into_iter().map(|p| (p, true)));

        for (path, in_trash) in files {
            let label = path.display().to_string();
            let parsed = match self.files.read_document(&path) {
                Ok(parsed) => parsed,
                Err(err) => {
                    let err = BuildError::from_store(err, &path);
                    warn!(path = %path.display(), error = %err.message(), "skipping unreadable file");
                    progress.on_item(&label, &ItemOutcome::Failed(err.message().to_string()));
                    result.errors.push(err);
                    continue;
                }
            };

            let id = parsed.header.id;
            if let Some(first) = claimed.get(&id) {
                warn!(id = %id, path = %path.display(), "identifier already claimed");
                result
                    .duplicates
                    .entry(id)
                    .or_insert_with(|| vec![first.clone()])
                    .push(path.clone());
                progress.on_item(&label, &ItemOutcome::Unchanged);
                continue;
            }

            let record = IndexRecord::from_file(&parsed.header, &parsed.body, &path, in_trash);
            index.upsert(&record)?;
            claimed.insert(id, path);
            result.indexed += 1;
            progress.on_item(&label, &ItemOutcome::Changed);
        }

        info!(
            indexed = result.indexed,
            duplicates = result.duplicates.len(),
            errors = result.errors.len(),
            "index rebuilt from files"
        );
        progress.on_complete(result.indexed, result.errors.len());
        Ok(result)
    }
}
