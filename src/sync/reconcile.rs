//! File-side decisions for a single document.
//!
//! Everything here is derived from current state: the document as the
//! repository holds it, the file on disk and the last indexed body hash.

use crate::domain::{Document, DocumentId, StorageMode};
use crate::error::{ErrorKind, ItemError};
use crate::index::{IndexRecord, folder_string};
use crate::infra::{ContentHash, DocumentHeader, FileStore, FileStoreError, ParsedFile, PathPlanner};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the file tree holds for one document.
pub(crate) enum OnDisk {
    Absent,
    Present { path: PathBuf, parsed: ParsedFile },
    Unreadable { path: PathBuf, error: FileStoreError },
}

impl OnDisk {
    /// Looks for a document's file at its recorded path, then at `target`,
    /// without scanning the tree.
    pub(crate) fn locate(files: &FileStore, doc: &Document, target: &Path) -> Self {
        let recorded = doc
            .file_path()
            .filter(|p| !FileStore::is_in_trash(p))
            .map(Path::to_path_buf);
        recorded
            .into_iter()
            .chain(std::iter::once(target.to_path_buf()))
            .find_map(|path| Self::read_at(files, doc, path))
            .unwrap_or(OnDisk::Absent)
    }

    /// Reads a found file again for a document edited since it was scanned.
    pub(crate) fn reread(self, files: &FileStore, doc: &Document) -> Self {
        match self {
            OnDisk::Present { path, .. } => {
                Self::read_at(files, doc, path).unwrap_or(OnDisk::Absent)
            }
            other => other,
        }
    }

    fn read_at(files: &FileStore, doc: &Document, path: PathBuf) -> Option<Self> {
        match files.read_document(&path) {
            Ok(parsed) if parsed.header.id == doc.id() => Some(OnDisk::Present { path, parsed }),
            Ok(_) => None,
            Err(error) if error.is_not_found() => None,
            Err(error) if doc.file_path() == Some(path.as_path()) => {
                Some(OnDisk::Unreadable { path, error })
            }
            Err(_) => None,
        }
    }
}

/// Every file under the root, read once and claimed by identifier.
pub(crate) struct TreeScan {
    pub by_id: HashMap<DocumentId, Vec<(PathBuf, ParsedFile)>>,
    pub trash_ids: HashSet<DocumentId>,
    pub unreadable: HashMap<PathBuf, FileStoreError>,
    pub no_identifier: Vec<PathBuf>,
}

impl TreeScan {
    pub(crate) fn read(files: &FileStore) -> Result<Self, FileStoreError> {
        let mut scan = TreeScan {
            by_id: HashMap::new(),
            trash_ids: HashSet::new(),
            unreadable: HashMap::new(),
            no_identifier: Vec::new(),
        };

        for path in files.list_all_document_files()? {
            match files.read_document(&path) {
                Ok(parsed) => scan
                    .by_id
                    .entry(parsed.header.id)
                    .or_default()
                    .push((path, parsed)),
                Err(FileStoreError::Parse { .. }) => scan.no_identifier.push(path),
                Err(err) => {
                    scan.unreadable.insert(path, err);
                }
            }
        }

        for path in files.list_trash_files()? {
            if let Ok(parsed) = files.read_document(&path) {
                scan.trash_ids.insert(parsed.header.id);
            }
        }
        Ok(scan)
    }

    /// Takes the file for `doc` out of the scan, wherever it sits.
    ///
    /// Fails with every claiming path when more than one file carries the
    /// identifier.
    pub(crate) fn take(&mut self, doc: &Document) -> Result<OnDisk, Vec<PathBuf>> {
        match self.by_id.remove(&doc.id()) {
            Some(mut claims) if claims.len() == 1 => {
                let (path, parsed) = claims.remove(0);
                Ok(OnDisk::Present { path, parsed })
            }
            Some(claims) => Err(claims.into_iter().map(|(p, _)| p).collect()),
            None => Ok(doc
                .file_path()
                .and_then(|p| self.unreadable.remove_entry(p))
                .map(|(path, error)| OnDisk::Unreadable { path, error })
                .unwrap_or(OnDisk::Absent)),
        }
    }
}

/// Outcome of reconciling one live document against its file.
#[derive(Debug, Default)]
pub(crate) struct Reconciled {
    /// A file was written, moved or rewritten.
    pub files_changed: bool,
    /// The document needs saving (path, counts or imported content).
    pub doc_changed: bool,
    /// Hash of the body the user sees, for the index record.
    pub body_hash: Option<ContentHash>,
    /// Hybrid content disagrees and was left alone.
    pub drift: bool,
    /// File-backed document with no file.
    pub missing: bool,
}

/// Brings a live document's file in line with the repository.
///
/// `base_hash` is the body hash recorded by the last pass; for hybrid
/// documents it tells an unsynced repository edit apart from drift.
pub(crate) fn reconcile_files(
    files: &FileStore,
    doc: &mut Document,
    target: &Path,
    disk: OnDisk,
    base_hash: Option<&ContentHash>,
) -> Result<Reconciled, ItemError> {
    let mut out = Reconciled::default();
    let id = doc.id();
    let item = |err: FileStoreError| ItemError::from_files(id, &err);

    let (mut path, parsed) = match disk {
        OnDisk::Unreadable { path, error } => {
            return Err(ItemError::from_files(path.display(), &error));
        }
        OnDisk::Absent => {
            if doc.storage_mode() == StorageMode::File {
                out.missing = true;
                return Ok(out);
            }
            materialize(files, doc, target).map_err(item)?;
            debug!(id = %id, path = %target.display(), "materialised file");
            if doc.file_path() != Some(target) {
                doc.set_file_path(Some(target.to_path_buf()));
                out.doc_changed = true;
            }
            out.files_changed = true;
            out.body_hash = Some(ContentHash::of_text(doc.content()));
            return Ok(out);
        }
        OnDisk::Present { path, parsed } => (path, parsed),
    };

    if path != target {
        files.move_file(&path, target).map_err(item)?;
        files.remove_empty_dirs(&path);
        debug!(id = %id, from = %path.display(), to = %target.display(), "relocated file");
        path = target.to_path_buf();
        out.files_changed = true;
    }
    if doc.file_path() != Some(path.as_path()) {
        doc.set_file_path(Some(path.clone()));
        out.doc_changed = true;
    }

    match doc.storage_mode() {
        StorageMode::Repository => {
            let mut rewrite = false;
            if parsed.body != doc.content() {
                let file_time = files.modified_time(&path).map_err(item)?;
                // Ties go to the repository.
                if file_time > doc.modified() {
                    debug!(id = %id, "file is newer; importing content");
                    doc.set_content(parsed.body.clone(), file_time);
                    out.doc_changed = true;
                } else {
                    debug!(id = %id, "repository is newer; rewriting file");
                    rewrite = true;
                }
            }
            let header = DocumentHeader::for_document(doc);
            if rewrite || header != parsed.header {
                files
                    .write_document(&path, &header, doc.content())
                    .map_err(item)?;
                out.files_changed = true;
            }
            out.body_hash = Some(ContentHash::of_text(doc.content()));
        }
        StorageMode::File => {
            let before = (doc.word_count(), doc.char_count());
            doc.record_counts_for(&parsed.body);
            if (doc.word_count(), doc.char_count()) != before {
                out.doc_changed = true;
            }
            let header = DocumentHeader::for_document(doc);
            if header != parsed.header {
                files
                    .write_document(&path, &header, &parsed.body)
                    .map_err(item)?;
                out.files_changed = true;
            }
            out.body_hash = Some(ContentHash::of_text(&parsed.body));
        }
        StorageMode::Hybrid => {
            let disk_hash = ContentHash::of_text(&parsed.body);
            let repo_hash = ContentHash::of_text(doc.content());
            let header = DocumentHeader::for_document(doc);
            if disk_hash == repo_hash {
                if header != parsed.header {
                    files
                        .write_document(&path, &header, &parsed.body)
                        .map_err(item)?;
                    out.files_changed = true;
                }
                out.body_hash = Some(disk_hash);
            } else if base_hash == Some(&disk_hash) {
                debug!(id = %id, "file unchanged since last pass; mirroring repository");
                files
                    .write_document(&path, &header, doc.content())
                    .map_err(item)?;
                out.files_changed = true;
                out.body_hash = Some(repo_hash);
            } else {
                debug!(id = %id, "hybrid content drifted; leaving both sides");
                out.drift = true;
                out.body_hash = base_hash.cloned();
            }
        }
    }

    Ok(out)
}

/// Writes a document's repository content at `target`, refusing to replace
/// a file that belongs to another document.
pub(crate) fn materialize(
    files: &FileStore,
    doc: &Document,
    target: &Path,
) -> Result<(), FileStoreError> {
    if files.exists(target) {
        match files.read_document(target) {
            Ok(parsed) if parsed.header.id == doc.id() => {}
            _ => {
                return Err(FileStoreError::AlreadyExists {
                    path: target.to_path_buf(),
                });
            }
        }
    }
    files.write_document(target, &DocumentHeader::for_document(doc), doc.content())
}

/// Hash of repository-held content, `None` for file-backed documents.
pub(crate) fn body_hash(doc: &Document) -> Option<ContentHash> {
    doc.storage_mode()
        .repository_holds_content()
        .then(|| ContentHash::of_text(doc.content()))
}

/// The index record a document should have.
pub(crate) fn index_record_for(
    doc: &Document,
    planner: &PathPlanner,
    hash: Option<ContentHash>,
    missing: bool,
) -> IndexRecord {
    let folder = if doc.is_trashed() {
        String::new()
    } else {
        doc.folder()
            .and_then(|f| planner.folder_dir(&f))
            .map(folder_string)
            .unwrap_or_default()
    };
    IndexRecord::from_document(doc, &folder, hash).with_missing(missing)
}

/// Case-insensitive path comparison, matching how the resolver treats names.
pub(crate) fn same_path(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

pub(crate) fn collision(doc: &Document, paths: &[PathBuf]) -> ItemError {
    let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    ItemError::new(
        doc.id(),
        ErrorKind::IdentifierCollision,
        format!("identifier claimed by {}", joined.join(", ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let files = FileStore::open(dir.path()).unwrap();
        (dir, files)
    }

    fn repo_doc(title: &str, content: &str) -> Document {
        let mut doc = Document::new(DocumentId::new(), title, None, Utc::now() - Duration::hours(1));
        doc.set_content(content, Utc::now() - Duration::hours(1));
        doc
    }

    #[test]
    fn absent_file_is_materialised() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "hello");
        let target = Path::new("Notes.md");

        let out = reconcile_files(&files, &mut doc, target, OnDisk::Absent, None).unwrap();
        assert!(out.files_changed);
        assert!(out.doc_changed);
        assert_eq!(doc.file_path(), Some(target));
        assert_eq!(files.read_document(target).unwrap().body, "hello");
    }

    #[test]
    fn absent_file_for_file_mode_is_missing() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "");
        doc.set_storage_mode(StorageMode::File);
        let out =
            reconcile_files(&files, &mut doc, Path::new("Notes.md"), OnDisk::Absent, None).unwrap();
        assert!(out.missing);
        assert!(!files.exists(Path::new("Notes.md")));
    }

    #[test]
    fn newer_file_is_imported() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "old");
        let target = Path::new("Notes.md");
        files
            .write_document(target, &DocumentHeader::for_document(&doc), "edited outside")
            .unwrap();
        doc.set_file_path(Some(target.to_path_buf()));

        let disk = OnDisk::locate(&files, &doc, target);
        let out = reconcile_files(&files, &mut doc, target, disk, None).unwrap();
        assert!(out.doc_changed);
        assert_eq!(doc.content(), "edited outside");
        assert_eq!(files.read_document(target).unwrap().body, "edited outside");
    }

    #[test]
    fn newer_repository_rewrites_file() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "old");
        let target = Path::new("Notes.md");
        files
            .write_document(target, &DocumentHeader::for_document(&doc), "old")
            .unwrap();
        doc.set_file_path(Some(target.to_path_buf()));
        doc.set_content("new", Utc::now() + Duration::minutes(1));

        let disk = OnDisk::locate(&files, &doc, target);
        let out = reconcile_files(&files, &mut doc, target, disk, None).unwrap();
        assert!(out.files_changed);
        assert_eq!(files.read_document(target).unwrap().body, "new");
    }

    #[test]
    fn equal_timestamps_keep_repository_content() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "repository");
        let target = Path::new("Notes.md");
        files
            .write_document(target, &DocumentHeader::for_document(&doc), "file")
            .unwrap();
        doc.set_file_path(Some(target.to_path_buf()));
        std::fs::File::options()
            .write(true)
            .open(files.absolute(target).unwrap())
            .unwrap()
            .set_modified(doc.modified().into())
            .unwrap();
        assert_eq!(files.modified_time(target).unwrap(), doc.modified());

        let disk = OnDisk::locate(&files, &doc, target);
        let out = reconcile_files(&files, &mut doc, target, disk, None).unwrap();
        assert!(out.files_changed);
        assert_eq!(doc.content(), "repository");
        assert_eq!(files.read_document(target).unwrap().body, "repository");
    }

    #[test]
    fn file_at_wrong_path_is_relocated() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "x");
        let old = Path::new("Old/Notes.md");
        files
            .write_document(old, &DocumentHeader::for_document(&doc), "x")
            .unwrap();
        doc.set_file_path(Some(old.to_path_buf()));

        let target = Path::new("Notes.md");
        let disk = OnDisk::locate(&files, &doc, target);
        reconcile_files(&files, &mut doc, target, disk, None).unwrap();
        assert!(files.exists(target));
        assert!(!files.exists(old));
        assert_eq!(doc.file_path(), Some(target));
    }

    #[test]
    fn hybrid_mismatch_without_base_is_drift() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "repo text");
        doc.set_storage_mode(StorageMode::Hybrid);
        let target = Path::new("Notes.md");
        files
            .write_document(target, &DocumentHeader::for_document(&doc), "disk text")
            .unwrap();
        doc.set_file_path(Some(target.to_path_buf()));

        let disk = OnDisk::locate(&files, &doc, target);
        let out = reconcile_files(&files, &mut doc, target, disk, None).unwrap();
        assert!(out.drift);
        assert!(!out.files_changed);
        assert_eq!(files.read_document(target).unwrap().body, "disk text");
        assert_eq!(doc.content(), "repo text");
    }

    #[test]
    fn hybrid_unchanged_file_is_mirrored() {
        let (_dir, files) = setup();
        let mut doc = repo_doc("Notes", "new text");
        doc.set_storage_mode(StorageMode::Hybrid);
        let target = Path::new("Notes.md");
        files
            .write_document(target, &DocumentHeader::for_document(&doc), "old text")
            .unwrap();
        doc.set_file_path(Some(target.to_path_buf()));

        let base = ContentHash::of_text("old text");
        let disk = OnDisk::locate(&files, &doc, target);
        let out = reconcile_files(&files, &mut doc, target, disk, Some(&base)).unwrap();
        assert!(!out.drift);
        assert_eq!(files.read_document(target).unwrap().body, "new text");
    }

    #[test]
    fn materialize_refuses_foreign_file() {
        let (_dir, files) = setup();
        let other = repo_doc("Notes", "theirs");
        let target = Path::new("Notes.md");
        files
            .write_document(target, &DocumentHeader::for_document(&other), "theirs")
            .unwrap();

        let mine = repo_doc("Notes", "mine");
        assert!(materialize(&files, &mine, target).is_err());
        assert_eq!(files.read_document(target).unwrap().body, "theirs");
    }
}
