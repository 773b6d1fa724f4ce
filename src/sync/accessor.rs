//! Per-document read/write surface that hides where content lives.

use super::LibraryPlan;
use crate::domain::{Document, DocumentId, StorageMode};
use crate::error::{Error, Result};
use crate::infra::{DocumentHeader, FileStore, FileStoreError};
use crate::repository::DocumentRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Repository,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRead {
    pub text: String,
    pub source: ContentSource,
    /// Repository and file disagree. Only ever set for hybrid documents.
    pub drift: bool,
}

/// Reads and writes a document's content according to its storage mode.
///
/// A write is durable once the repository save succeeds. File-backed
/// documents are written through to disk first, since the repository holds
/// no copy of their content.
pub struct ContentAccessor<'a> {
    repo: &'a mut dyn DocumentRepository,
    files: &'a FileStore,
}

impl<'a> ContentAccessor<'a> {
    pub fn new(repo: &'a mut dyn DocumentRepository, files: &'a FileStore) -> Self {
        Self { repo, files }
    }

    /// # Errors
    ///
    /// Returns `DocumentNotFound` for an unknown id, and file store errors
    /// when a file-backed document's file cannot be read.
    pub fn read(&self, id: &DocumentId) -> Result<ContentRead> {
        let doc = self.load(id)?;
        match doc.storage_mode() {
            StorageMode::Repository => Ok(ContentRead {
                text: doc.content().to_string(),
                source: ContentSource::Repository,
                drift: false,
            }),
            StorageMode::File => {
                let path = doc.file_path().ok_or_else(|| {
                    Error::Files(FileStoreError::NotFound {
                        path: PathBuf::from(doc.title()),
                    })
                })?;
                let parsed = self.files.read_document(path)?;
                Ok(ContentRead {
                    text: parsed.body,
                    source: ContentSource::File,
                    drift: false,
                })
            }
            StorageMode::Hybrid => {
                let Some(path) = doc.file_path() else {
                    return Ok(ContentRead {
                        text: doc.content().to_string(),
                        source: ContentSource::Repository,
                        drift: false,
                    });
                };
                match self.files.read_document(path) {
                    Ok(parsed) => {
                        let drift = parsed.body != doc.content();
                        if drift {
                            warn!(id = %doc.id(), "hybrid read found drift; serving file content");
                        }
                        Ok(ContentRead {
                            text: parsed.body,
                            source: ContentSource::File,
                            drift,
                        })
                    }
                    Err(err) if err.is_not_found() => Ok(ContentRead {
                        text: doc.content().to_string(),
                        source: ContentSource::Repository,
                        drift: false,
                    }),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    /// Replaces a document's content and returns the saved document.
    ///
    /// Repository and hybrid documents are saved to the repository only; the
    /// next sync mirrors them to disk. File-backed documents are written to
    /// disk, then their counts and timestamp are saved.
    pub fn write(&mut self, id: &DocumentId, text: &str, now: DateTime<Utc>) -> Result<Document> {
        let mut doc = self.load(id)?;
        doc.set_content(text, now);

        if doc.storage_mode() == StorageMode::File {
            let path = match doc.file_path() {
                Some(path) => path.to_path_buf(),
                None => self.planned_path(&doc)?,
            };
            self.files
                .write_document(&path, &DocumentHeader::for_document(&doc), text)?;
            debug!(id = %doc.id(), path = %path.display(), "wrote file-backed content");
            doc.clear_repository_content();
            doc.set_file_path(Some(path));
        }

        self.repo.save_document(&doc)?;
        Ok(doc)
    }

    fn load(&self, id: &DocumentId) -> Result<Document> {
        self.repo
            .get_document(id)?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    fn planned_path(&self, doc: &Document) -> Result<PathBuf> {
        let plan = LibraryPlan::load(&*self.repo)?;
        let path = plan
            .planner
            .path_for(&doc.id())
            .map(|p| p.to_path_buf())
            .ok_or_else(|| Error::Invalid(format!("{} has no resolvable path", doc)))?;
        // Never write over a file that belongs to someone else.
        if self.files.exists(&path)
            && !self
                .files
                .read_document(&path)
                .is_ok_and(|p| p.header.id == doc.id())
        {
            return Err(FileStoreError::AlreadyExists { path }.into());
        }
        Ok(path)
    }
}
