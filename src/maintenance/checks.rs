//! Pure detection functions over a snapshot of the three stores.
//!
//! Nothing here touches the disk or a database; the engine reads a
//! [`Snapshot`] once and every check works on it in memory.

use crate::domain::{
    Document, DocumentId, FileIntegrity, Folder, FolderId, IssueKind, StorageMode, StorageStats,
};
use crate::index::{IndexRecord, IndexStore};
use crate::infra::{ContentHash, FileStore, FileStoreError};
use crate::repository::RepositoryAccess;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// What a scanned file turned out to hold.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FileContent {
    Document { id: DocumentId, body: String },
    /// No front-matter, or front-matter without a valid identifier.
    NoIdentifier,
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScannedFile {
    pub path: PathBuf,
    pub content: FileContent,
}

impl ScannedFile {
    fn id(&self) -> Option<DocumentId> {
        match &self.content {
            FileContent::Document { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Everything the checks look at, read in one go.
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    /// Every document, trashed ones included.
    pub documents: Vec<Document>,
    pub folders: Vec<Folder>,
    /// Files outside the trash.
    pub files: Vec<ScannedFile>,
    pub trash: Vec<ScannedFile>,
    pub records: Vec<IndexRecord>,
}

impl Snapshot {
    /// Reads documents and the live file tree only.
    ///
    /// The repository is locked for the listing, not for the tree walk.
    pub(crate) fn read_quick(repo: &mut RepositoryAccess<'_>, files: &FileStore) -> Result<Self> {
        let documents = repo.lock().list_documents(true)?;
        Ok(Self {
            documents,
            files: scan(files, files.list_all_document_files()?),
            ..Self::default()
        })
    }

    pub(crate) fn read_full(
        repo: &mut RepositoryAccess<'_>,
        index: &dyn IndexStore,
        files: &FileStore,
    ) -> Result<Self> {
        let (documents, folders) = {
            let repo = repo.lock();
            (repo.list_documents(true)?, repo.list_folders()?)
        };
        Ok(Self {
            documents,
            folders,
            files: scan(files, files.list_all_document_files()?),
            trash: scan(files, files.list_trash_files()?),
            records: index.all_records()?,
        })
    }

    /// Live files grouped by the identifier they claim.
    fn claims(&self) -> HashMap<DocumentId, Vec<&ScannedFile>> {
        let mut claims: HashMap<DocumentId, Vec<&ScannedFile>> = HashMap::new();
        for file in &self.files {
            if let Some(id) = file.id() {
                claims.entry(id).or_default().push(file);
            }
        }
        claims
    }
}

fn scan(files: &FileStore, paths: Vec<PathBuf>) -> Vec<ScannedFile> {
    paths
        .into_iter()
        .filter_map(|path| {
            let content = match files.read_document(&path) {
                Ok(parsed) => FileContent::Document {
                    id: parsed.header.id,
                    body: parsed.body,
                },
                Err(FileStoreError::Parse { .. }) => FileContent::NoIdentifier,
                // Gone between listing and reading.
                Err(err) if err.is_not_found() => return None,
                Err(err) => FileContent::Unreadable(err.to_string()),
            };
            Some(ScannedFile { path, content })
        })
        .collect()
}

/// Identifiers claimed by more than one live file, or by a live file while
/// their document sits in the trash.
pub(crate) fn find_duplicate_identifiers(snapshot: &Snapshot) -> Vec<IssueKind> {
    let trashed: HashMap<DocumentId, &Document> = snapshot
        .documents
        .iter()
        .filter(|d| d.is_trashed())
        .map(|d| (d.id(), d))
        .collect();
    let grouped: BTreeMap<DocumentId, Vec<PathBuf>> = snapshot
        .claims()
        .into_iter()
        .filter(|(id, files)| files.len() > 1 || trashed.contains_key(id))
        .map(|(id, files)| {
            let mut paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
            paths.extend(
                trashed
                    .get(&id)
                    .and_then(|d| d.file_path())
                    .map(Path::to_path_buf),
            );
            paths.sort();
            (id, paths)
        })
        .collect();
    grouped
        .into_iter()
        .map(|(id, paths)| IssueKind::DuplicateIdentifier { id, paths })
        .collect()
}

/// File-backed documents with no readable file left anywhere in the tree.
pub(crate) fn find_no_storage(snapshot: &Snapshot) -> Vec<IssueKind> {
    let claims = snapshot.claims();
    snapshot
        .documents
        .iter()
        .filter(|d| !d.is_trashed() && d.storage_mode() == StorageMode::File)
        .filter(|d| d.file_path().is_some() || d.char_count() > 0)
        .filter(|d| !claims.contains_key(&d.id()))
        .map(|d| IssueKind::NoStorage { id: d.id() })
        .collect()
}

/// Materialised documents whose file is gone while the repository still
/// holds their content.
pub(crate) fn find_missing_files(snapshot: &Snapshot) -> Vec<IssueKind> {
    let claims = snapshot.claims();
    snapshot
        .documents
        .iter()
        .filter(|d| !d.is_trashed() && d.storage_mode().repository_holds_content())
        .filter(|d| !claims.contains_key(&d.id()))
        .filter_map(|d| {
            d.file_path().map(|path| IssueKind::MissingFile {
                id: d.id(),
                path: path.to_path_buf(),
            })
        })
        .collect()
}

/// Live files that no document claims, including files with no identifier.
pub(crate) fn find_orphaned_files(snapshot: &Snapshot) -> Vec<IssueKind> {
    let known: HashSet<DocumentId> = snapshot.documents.iter().map(Document::id).collect();
    snapshot
        .files
        .iter()
        .filter_map(|file| match &file.content {
            FileContent::Document { id, .. } if !known.contains(id) => {
                Some(IssueKind::OrphanedFile {
                    path: file.path.clone(),
                    id: Some(*id),
                })
            }
            FileContent::NoIdentifier => Some(IssueKind::OrphanedFile {
                path: file.path.clone(),
                id: None,
            }),
            _ => None,
        })
        .collect()
}

pub(crate) fn find_broken_folder_references(snapshot: &Snapshot) -> Vec<IssueKind> {
    let folders: HashSet<FolderId> = snapshot.folders.iter().map(Folder::id).collect();
    snapshot
        .documents
        .iter()
        .filter(|d| !d.is_trashed())
        .filter_map(|d| {
            d.folder()
                .filter(|f| !folders.contains(f))
                .map(|folder| IssueKind::BrokenFolderReference { id: d.id(), folder })
        })
        .collect()
}

/// Trashed documents missing their trash file, and trash files that belong
/// to no trashed document.
pub(crate) fn find_dangling_trash(snapshot: &Snapshot) -> Vec<IssueKind> {
    let in_trash: HashSet<DocumentId> = snapshot.trash.iter().filter_map(ScannedFile::id).collect();
    let trashed: HashMap<DocumentId, &Document> = snapshot
        .documents
        .iter()
        .filter(|d| d.is_trashed())
        .map(|d| (d.id(), d))
        .collect();

    let mut issues: Vec<IssueKind> = trashed
        .values()
        .filter(|d| !in_trash.contains(&d.id()))
        .filter_map(|d| {
            d.file_path().map(|path| IssueKind::DanglingTrashEntry {
                path: path.to_path_buf(),
                id: Some(d.id()),
                recoverable: d.storage_mode().repository_holds_content(),
            })
        })
        .collect();
    issues.sort_by_key(|issue| issue.subject().to_string());

    issues.extend(
        snapshot
            .trash
            .iter()
            .filter(|f| f.id().is_none_or(|id| !trashed.contains_key(&id)))
            .filter(|f| !matches!(f.content, FileContent::Unreadable(_)))
            .map(|f| IssueKind::DanglingTrashEntry {
                path: f.path.clone(),
                id: None,
                recoverable: false,
            }),
    );
    issues
}

/// Documents whose index record is absent or behind the repository.
pub(crate) fn find_stale_records(snapshot: &Snapshot) -> Vec<IssueKind> {
    let records: HashMap<DocumentId, &IndexRecord> =
        snapshot.records.iter().map(|r| (r.id(), r)).collect();
    snapshot
        .documents
        .iter()
        .filter(|d| match records.get(&d.id()) {
            None => true,
            Some(r) => {
                r.modified() < d.modified()
                    || r.is_trashed() != d.is_trashed()
                    || r.path() != d.file_path()
                    || r.title() != d.title()
            }
        })
        .map(|d| IssueKind::StaleIndexRecord { id: d.id() })
        .collect()
}

/// Index records backed by neither a document nor any file.
pub(crate) fn find_orphaned_records(snapshot: &Snapshot) -> Vec<IssueKind> {
    let backed: HashSet<DocumentId> = snapshot
        .documents
        .iter()
        .map(Document::id)
        .chain(snapshot.files.iter().filter_map(ScannedFile::id))
        .chain(snapshot.trash.iter().filter_map(ScannedFile::id))
        .collect();
    snapshot
        .records
        .iter()
        .filter(|r| !backed.contains(&r.id()))
        .map(|r| IssueKind::OrphanedIndexRecord { id: r.id() })
        .collect()
}

/// Hybrid documents whose file changed on its own since the last sync while
/// the repository content differs too.
///
/// A file still matching the last indexed hash only lags behind a repository
/// edit; sync mirrors that without asking.
pub(crate) fn find_content_drift(snapshot: &Snapshot) -> Vec<IssueKind> {
    let claims = snapshot.claims();
    let base: HashMap<DocumentId, &ContentHash> = snapshot
        .records
        .iter()
        .filter_map(|r| r.content_hash().map(|h| (r.id(), h)))
        .collect();
    snapshot
        .documents
        .iter()
        .filter(|d| !d.is_trashed() && d.storage_mode() == StorageMode::Hybrid)
        .filter_map(|d| {
            let [file] = claims.get(&d.id())?.as_slice() else {
                return None;
            };
            let FileContent::Document { body, .. } = &file.content else {
                return None;
            };
            if body == d.content() {
                return None;
            }
            let disk = ContentHash::of_text(body);
            if base.get(&d.id()).is_some_and(|h| **h == disk) {
                return None;
            }
            Some(IssueKind::ContentDrift {
                id: d.id(),
                path: file.path.clone(),
            })
        })
        .collect()
}

pub(crate) fn find_unreadable_files(snapshot: &Snapshot) -> Vec<IssueKind> {
    snapshot
        .files
        .iter()
        .chain(&snapshot.trash)
        .filter_map(|f| match &f.content {
            FileContent::Unreadable(message) => Some(IssueKind::UnreadableFile {
                path: f.path.clone(),
                message: message.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Critical issues only: the quick health check.
pub(crate) fn critical_issues(snapshot: &Snapshot) -> Vec<IssueKind> {
    let mut issues = find_duplicate_identifiers(snapshot);
    issues.extend(find_no_storage(snapshot));
    issues
}

/// The complete taxonomy, most severe first.
pub(crate) fn all_issues(snapshot: &Snapshot) -> Vec<IssueKind> {
    let mut issues = critical_issues(snapshot);
    issues.extend(find_missing_files(snapshot));
    issues.extend(find_broken_folder_references(snapshot));
    issues.extend(find_content_drift(snapshot));
    issues.extend(find_unreadable_files(snapshot));
    issues.extend(find_orphaned_files(snapshot));
    issues.extend(find_dangling_trash(snapshot));
    issues.extend(find_stale_records(snapshot));
    issues.extend(find_orphaned_records(snapshot));
    issues
}

pub(crate) fn storage_stats(documents: &[Document]) -> StorageStats {
    let mut stats = StorageStats::default();
    for doc in documents {
        if doc.is_trashed() {
            stats.trashed += 1;
            continue;
        }
        stats.total += 1;
        match doc.storage_mode() {
            StorageMode::File => stats.file_backed += 1,
            StorageMode::Repository => stats.repository_only += 1,
            StorageMode::Hybrid => stats.hybrid += 1,
        }
        if doc.is_empty() {
            stats.empty += 1;
        }
    }
    stats
}

/// Checks every live document's recorded path against the disk.
pub(crate) fn file_integrity(documents: &[Document], files: &FileStore) -> FileIntegrity {
    let mut integrity = FileIntegrity::default();
    for path in documents
        .iter()
        .filter(|d| !d.is_trashed())
        .filter_map(Document::file_path)
    {
        if files.exists(path) {
            integrity.valid += 1;
        } else {
            integrity.missing += 1;
        }
    }
    integrity
}
