//! File store adapter: the only code that touches document files on disk.
//!
//! All paths handed in and out are relative to the store root. Writes are
//! whole-file replacements published by atomic rename, and every move or
//! delete goes through one mutex per store.

use crate::infra::content_hash::ContentHash;
use crate::infra::frontmatter::{DocumentHeader, ParseError, ParsedFile, parse_with_hash, serialize};
use crate::infra::slug::DOCUMENT_EXTENSION;
use chrono::{DateTime, Utc};
use std::io::{self, Write as IoWrite};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Name of the trash directory directly under the root.
pub const TRASH_DIR: &str = ".trash";

/// Errors during file store operations.
#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid encoding in {path}: {encoding}")]
    InvalidEncoding { path: PathBuf, encoding: String },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("path escapes the library root: {path}")]
    OutsideRoot { path: PathBuf },

    #[error("library root is unavailable: {path}")]
    RootUnavailable { path: PathBuf },
}

impl FileStoreError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FileStoreError::NotFound { path: path.into() },
            io::ErrorKind::PermissionDenied => {
                FileStoreError::PermissionDenied { path: path.into() }
            }
            io::ErrorKind::AlreadyExists => FileStoreError::AlreadyExists { path: path.into() },
            _ => FileStoreError::Io {
                path: path.into(),
                source: error,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FileStoreError::NotFound { .. })
    }

    /// True for decoding and parsing failures, as opposed to I/O.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            FileStoreError::InvalidEncoding { .. } | FileStoreError::Parse { .. }
        )
    }
}

pub type FileStoreResult<T> = Result<T, FileStoreError>;

/// Document files under one root directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    moves: Mutex<()>,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `FileStoreError::RootUnavailable` if the root cannot be created
    /// or is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> FileStoreResult<Self> {
        let root = root.into();
        if std::fs::create_dir_all(&root).is_err() || !root.is_dir() {
            return Err(FileStoreError::RootUnavailable { path: root });
        }
        Ok(Self {
            root,
            moves: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root-relative path of the trash directory.
    pub fn trash_dir(&self) -> &Path {
        Path::new(TRASH_DIR)
    }

    /// True if a root-relative path lies inside the trash.
    pub fn is_in_trash(path: &Path) -> bool {
        path.components()
            .next()
            .is_some_and(|c| c.as_os_str() == TRASH_DIR)
    }

    /// Converts an absolute path under the root to a root-relative one.
    pub fn relative_path(&self, absolute: &Path) -> Option<PathBuf> {
        absolute
            .strip_prefix(&self.root)
            .ok()
            .map(Path::to_path_buf)
    }

    /// Absolute path for a root-relative one.
    ///
    /// # Errors
    ///
    /// Returns `FileStoreError::OutsideRoot` for absolute paths or any `..`.
    pub fn absolute(&self, relative: &Path) -> FileStoreResult<PathBuf> {
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !clean || relative.as_os_str().is_empty() {
            return Err(FileStoreError::OutsideRoot {
                path: relative.into(),
            });
        }
        Ok(self.root.join(relative))
    }

    pub fn exists(&self, relative: &Path) -> bool {
        self.absolute(relative).is_ok_and(|p| p.is_file())
    }

    /// Writes `content` to `relative`, replacing any existing file.
    ///
    /// Parent directories are created. The content is written to a temporary
    /// file in the target directory and renamed into place.
    pub fn write(&self, relative: &Path, content: &str) -> FileStoreResult<()> {
        let path = self.absolute(relative)?;
        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(|e| FileStoreError::from_io(parent, e))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| FileStoreError::Io {
            path: relative.into(),
            source: e,
        })?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| FileStoreError::Io {
                path: relative.into(),
                source: e,
            })?;
        temp.persist(&path).map_err(|e| FileStoreError::Io {
            path: relative.into(),
            source: e.error,
        })?;

        debug!(path = %relative.display(), bytes = content.len(), "wrote file");
        Ok(())
    }

    /// Reads and decodes a text file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `PermissionDenied` or `Io` for I/O failures and
    /// `InvalidEncoding` for anything that is not UTF-8 text with LF or CRLF
    /// line endings.
    pub fn read(&self, relative: &Path) -> FileStoreResult<String> {
        let bytes = self.read_bytes(relative)?;
        decode_text(bytes, relative)
    }

    /// Reads and parses a document file.
    pub fn read_document(&self, relative: &Path) -> FileStoreResult<ParsedFile> {
        let bytes = self.read_bytes(relative)?;
        let hash = ContentHash::compute(&bytes);
        let text = decode_text(bytes, relative)?;
        parse_with_hash(&text, hash).map_err(|e| FileStoreError::Parse {
            path: relative.into(),
            source: e,
        })
    }

    /// Writes a document file with its front-matter header.
    pub fn write_document(
        &self,
        relative: &Path,
        header: &DocumentHeader,
        body: &str,
    ) -> FileStoreResult<()> {
        self.write(relative, &serialize(header, body))
    }

    /// Moves a file into the trash, mirroring its relative path.
    ///
    /// Returns the root-relative trash path. An existing file in the trash is
    /// never overwritten; the new one gets ` 2`, ` 3` and so on.
    pub fn move_to_trash(&self, relative: &Path) -> FileStoreResult<PathBuf> {
        let _guard = self.lock();
        let from = self.absolute(relative)?;
        if !from.is_file() {
            return Err(FileStoreError::NotFound {
                path: relative.into(),
            });
        }
        let target = self.unique_path(&Path::new(TRASH_DIR).join(relative))?;
        self.rename(relative, &target)?;
        Ok(target)
    }

    /// Moves a file out of the trash to `destination`.
    pub fn restore_from_trash(
        &self,
        trash_path: &Path,
        destination: &Path,
    ) -> FileStoreResult<PathBuf> {
        if !Self::is_in_trash(trash_path) {
            return Err(FileStoreError::NotFound {
                path: trash_path.into(),
            });
        }
        self.move_file(trash_path, destination)?;
        self.remove_empty_dirs(trash_path);
        Ok(destination.to_path_buf())
    }

    /// Moves a file within the root. Never overwrites an existing file,
    /// except when only the letter case of the name changes.
    pub fn move_file(&self, from: &Path, to: &Path) -> FileStoreResult<()> {
        let _guard = self.lock();
        let target = self.absolute(to)?;
        let case_only = from.to_string_lossy().to_lowercase() == to.to_string_lossy().to_lowercase();
        if target.exists() && !case_only {
            return Err(FileStoreError::AlreadyExists { path: to.into() });
        }
        self.rename(from, to)
    }

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns `FileStoreError::NotFound` if there is nothing to delete.
    pub fn permanently_delete(&self, relative: &Path) -> FileStoreResult<()> {
        let _guard = self.lock();
        let path = self.absolute(relative)?;
        std::fs::remove_file(&path).map_err(|e| FileStoreError::from_io(relative, e))?;
        debug!(path = %relative.display(), "deleted file");
        Ok(())
    }

    pub fn create_folder(&self, relative: &Path) -> FileStoreResult<()> {
        let path = self.absolute(relative)?;
        std::fs::create_dir_all(&path).map_err(|e| FileStoreError::from_io(relative, e))
    }

    /// Removes empty directories from the parent of `relative` up to (not
    /// including) the root. Stops at the first non-empty directory.
    pub fn remove_empty_dirs(&self, relative: &Path) {
        let mut cursor = relative.parent();
        while let Some(dir) = cursor {
            if dir.as_os_str().is_empty() {
                break;
            }
            let Ok(abs) = self.absolute(dir) else {
                break;
            };
            if std::fs::remove_dir(&abs).is_err() {
                break;
            }
            cursor = dir.parent();
        }
    }

    /// Filesystem modification time of a file.
    pub fn modified_time(&self, relative: &Path) -> FileStoreResult<DateTime<Utc>> {
        let path = self.absolute(relative)?;
        std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .map_err(|e| FileStoreError::from_io(relative, e))
    }

    /// Every document file under the root, outside the trash and other
    /// hidden directories, sorted.
    pub fn list_all_document_files(&self) -> FileStoreResult<Vec<PathBuf>> {
        self.scan(&self.root)
    }

    /// Every file in the trash, as root-relative paths.
    pub fn list_trash_files(&self) -> FileStoreResult<Vec<PathBuf>> {
        let trash = self.root.join(TRASH_DIR);
        if !trash.is_dir() {
            return Ok(Vec::new());
        }
        Ok(self
            .scan(&trash)?
            .into_iter()
            .map(|p| Path::new(TRASH_DIR).join(p))
            .collect())
    }

    fn scan(&self, dir: &Path) -> FileStoreResult<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(FileStoreError::RootUnavailable {
                path: self.root.clone(),
            });
        }
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(path = ?err.path(), error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(has_document_extension)
            .filter_map(|e| e.path().strip_prefix(dir).ok().map(Path::to_path_buf))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_bytes(&self, relative: &Path) -> FileStoreResult<Vec<u8>> {
        let path = self.absolute(relative)?;
        std::fs::read(&path).map_err(|e| FileStoreError::from_io(relative, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> FileStoreResult<()> {
        let source = self.absolute(from)?;
        let target = self.absolute(to)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FileStoreError::from_io(to, e))?;
        }
        std::fs::rename(&source, &target).map_err(|e| FileStoreError::from_io(from, e))?;
        debug!(from = %from.display(), to = %to.display(), "moved file");
        Ok(())
    }

    fn unique_path(&self, wanted: &Path) -> FileStoreResult<PathBuf> {
        if !self.absolute(wanted)?.exists() {
            return Ok(wanted.to_path_buf());
        }
        let stem = wanted
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = wanted.parent().unwrap_or(Path::new(""));
        (2u32..)
            .map(|n| parent.join(format!("{} {}.{}", stem, n, DOCUMENT_EXTENSION)))
            .find(|candidate| self.absolute(candidate).is_ok_and(|p| !p.exists()))
            .ok_or_else(|| FileStoreError::AlreadyExists {
                path: wanted.to_path_buf(),
            })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.moves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decodes file bytes into text.
///
/// Rejects UTF-16 byte order marks, invalid UTF-8 and CR-only line endings.
/// A UTF-8 byte order mark is stripped.
fn decode_text(bytes: Vec<u8>, path: &Path) -> FileStoreResult<String> {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Err(FileStoreError::InvalidEncoding {
            path: path.into(),
            encoding: "UTF-16 LE detected (byte order mark FF FE); convert to UTF-8".into(),
        });
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Err(FileStoreError::InvalidEncoding {
            path: path.into(),
            encoding: "UTF-16 BE detected (byte order mark FE FF); convert to UTF-8".into(),
        });
    }

    let content = String::from_utf8(bytes).map_err(|e| FileStoreError::InvalidEncoding {
        path: path.into(),
        encoding: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
    })?;

    let has_lone_cr = content
        .as_bytes()
        .windows(2)
        .any(|w| w[0] == b'\r' && w[1] != b'\n')
        || content.as_bytes().last() == Some(&b'\r');
    if has_lone_cr {
        return Err(FileStoreError::InvalidEncoding {
            path: path.into(),
            encoding: "CR-only line endings detected; convert to LF or CRLF".into(),
        });
    }

    Ok(match content.strip_prefix('\u{FEFF}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

fn has_document_extension(entry: &DirEntry) -> bool {
    entry
        .path()
        .extension()
        .is_some_and(|e| e == DOCUMENT_EXTENSION)
}
