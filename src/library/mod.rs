//! The library façade: one cloneable handle over the three stores.
//!
//! Every structural change (sync, maintenance, folder cascade, trash and
//! storage-mode changes) runs under a single pass lock, so no pass ever
//! observes another one half-way. Sync, maintenance and migration lock the
//! repository per document, so content reads and writes go through while
//! they run. Locks are always taken in the order pass, index, repository.

mod options;
mod session;
mod status;

pub use options::{
    Confirmation, DATA_DIR, DEFAULT_AUTOSAVE_DELAY, DEFAULT_QUICK_SYNC_DEBOUNCE, LibraryOptions,
};
pub use session::{EditSession, SyncTrigger};
pub use status::PassStatus;

use status::{Tracking, lock};

use crate::domain::{
    Document, DocumentId, FileIntegrity, Folder, FolderId, MaintenanceIssue, MigrationSummary,
    StorageMode, StorageStats,
};
use crate::error::{Error, ItemError, Result};
use crate::index::{BuildResult, IndexBuilder, IndexRecord, IndexStore, SqliteIndex, folder_string};
use crate::infra::{
    DocumentHeader, FileStore, FileStoreError, PathPlanner, create_backup, sanitize_component,
};
use crate::maintenance::{MaintenanceEngine, MaintenanceReport};
use crate::progress::{CancellationToken, NoopReporter, ProgressReporter};
use crate::repository::{DocumentRepository, SqliteRepository};
use crate::sync::{
    ContentAccessor, ContentRead, LibraryPlan, OnDisk, RenamePlan, SyncEngine, SyncReport,
    TreeScan, materialize,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Outcome of emptying the trash.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmptyTrashReport {
    /// Trashed documents purged.
    pub purged: usize,
    /// Trash files that belonged to no document, deleted as well.
    pub removed_files: usize,
    /// Snapshot taken beforehand, if it succeeded.
    pub backup: Option<PathBuf>,
    pub errors: Vec<ItemError>,
}

struct Inner {
    options: LibraryOptions,
    data_dir: PathBuf,
    files: FileStore,
    pass: Mutex<()>,
    repo: Mutex<SqliteRepository>,
    index: Mutex<SqliteIndex>,
    status: Mutex<Option<PassStatus>>,
    current: Mutex<Option<CancellationToken>>,
    last_report: Mutex<Option<MaintenanceReport>>,
}

/// A document library rooted at one directory.
#[derive(Clone)]
pub struct Library {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("root", &self.inner.files.root())
            .field("data_dir", &self.inner.data_dir)
            .finish()
    }
}

impl Library {
    /// Opens the library, creating the root and both databases if needed.
    ///
    /// # Errors
    ///
    /// Fails when the root cannot be created or either database cannot be
    /// opened; both are structural failures.
    pub fn open(options: LibraryOptions) -> Result<Self> {
        let files = FileStore::open(options.root())?;
        let data_dir = options.resolved_data_dir();
        let repo = SqliteRepository::open(&data_dir.join("library.db"))?;
        let index = SqliteIndex::open(&data_dir.join("index.db"))?;
        info!(root = %files.root().display(), data_dir = %data_dir.display(), "opened library");
        Ok(Self {
            inner: Arc::new(Inner {
                options,
                data_dir,
                files,
                pass: Mutex::new(()),
                repo: Mutex::new(repo),
                index: Mutex::new(index),
                status: Mutex::new(None),
                current: Mutex::new(None),
                last_report: Mutex::new(None),
            }),
        })
    }

    /// The library root, where document files live.
    pub fn get_notes_directory(&self) -> PathBuf {
        self.inner.files.root().to_path_buf()
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    pub fn files(&self) -> &FileStore {
        &self.inner.files
    }

    // ===== Passes =====

    pub fn perform_full_sync(&self) -> Result<SyncReport> {
        self.perform_full_sync_with_progress(&mut NoopReporter)
    }

    pub fn perform_full_sync_with_progress<P>(&self, progress: &mut P) -> Result<SyncReport>
    where
        P: ProgressReporter + ?Sized,
    {
        self.run_shared_pass("full sync", |repo, index, cancel| {
            let mut tracking = Tracking::new(&self.inner.status, progress);
            SyncEngine::shared(repo, index, &self.inner.files)
                .with_cancellation(cancel)
                .full_sync_with_progress(&mut tracking)
        })
    }

    pub fn perform_quick_sync(&self) -> Result<SyncReport> {
        self.perform_quick_sync_with_progress(&mut NoopReporter)
    }

    pub fn perform_quick_sync_with_progress<P>(&self, progress: &mut P) -> Result<SyncReport>
    where
        P: ProgressReporter + ?Sized,
    {
        self.run_shared_pass("quick sync", |repo, index, cancel| {
            let mut tracking = Tracking::new(&self.inner.status, progress);
            SyncEngine::shared(repo, index, &self.inner.files)
                .with_cancellation(cancel)
                .quick_sync_with_progress(&mut tracking)
        })
    }

    pub fn quick_health_check(&self) -> Result<MaintenanceReport> {
        let report = self.run_shared_pass("health check", |repo, index, _| {
            MaintenanceEngine::shared(repo, index, &self.inner.files).quick_health_check()
        })?;
        *lock(&self.inner.last_report) = Some(report.clone());
        Ok(report)
    }

    pub fn run_full_maintenance(&self, auto_fix: bool) -> Result<MaintenanceReport> {
        self.run_full_maintenance_with_progress(auto_fix, &mut NoopReporter)
    }

    pub fn run_full_maintenance_with_progress<P>(
        &self,
        auto_fix: bool,
        progress: &mut P,
    ) -> Result<MaintenanceReport>
    where
        P: ProgressReporter + ?Sized,
    {
        let report = self.run_shared_pass("maintenance", |repo, index, cancel| {
            let mut tracking = Tracking::new(&self.inner.status, progress);
            MaintenanceEngine::shared(repo, index, &self.inner.files)
                .with_cancellation(cancel)
                .run_full_maintenance_with_progress(auto_fix, &mut tracking)
        })?;
        *lock(&self.inner.last_report) = Some(report.clone());
        Ok(report)
    }

    pub fn fix_single_issue(&self, issue: &MaintenanceIssue) -> Result<bool> {
        self.run_pass("fix issue", |repo, index, _| {
            MaintenanceEngine::new(repo, index, &self.inner.files).fix_single_issue(issue)
        })
    }

    /// Moves every live document to its canonical path, materialising files
    /// that are missing. Documents already in place are skipped.
    ///
    /// A document's file is looked for by identifier across the whole tree,
    /// so a file moved by hand is brought back rather than written twice.
    pub fn migrate_to_new_file_structure(&self) -> Result<MigrationSummary> {
        self.run_shared_pass("migration", |repo, index, _| {
            let files = &self.inner.files;
            let plan = LibraryPlan::load(&*lock(repo))?;
            let mut scan = TreeScan::read(files)?;
            let mut summary = MigrationSummary::default();
            let mut changed = Vec::new();

            for doc in plan.documents.iter().filter(|d| !d.is_trashed()) {
                let Some(target) = plan.planner.path_for(&doc.id()) else {
                    summary.skipped += 1;
                    continue;
                };
                let disk = match scan.take(doc) {
                    Ok(disk) => disk,
                    Err(paths) => {
                        warn!(
                            id = %doc.id(),
                            files = paths.len(),
                            "identifier claimed by several files"
                        );
                        summary.failed += 1;
                        continue;
                    }
                };

                let mut repo = lock(repo);
                let Some(mut doc) = repo.get_document(&doc.id())? else {
                    continue;
                };
                match disk {
                    OnDisk::Present { path, .. }
                        if path == target && doc.file_path() == Some(target) =>
                    {
                        summary.skipped += 1;
                        continue;
                    }
                    OnDisk::Present { path, .. } => {
                        if path != target {
                            if let Err(err) = files.move_file(&path, target) {
                                warn!(id = %doc.id(), error = %err, "migration move failed");
                                summary.failed += 1;
                                continue;
                            }
                            files.remove_empty_dirs(&path);
                        }
                    }
                    OnDisk::Absent if doc.storage_mode().repository_holds_content() => {
                        if let Err(err) = materialize(files, &doc, target) {
                            warn!(id = %doc.id(), error = %err, "migration write failed");
                            summary.failed += 1;
                            continue;
                        }
                    }
                    OnDisk::Absent => {
                        warn!(id = %doc.id(), "file-backed document has no file to migrate");
                        summary.failed += 1;
                        continue;
                    }
                    OnDisk::Unreadable { path, error } => {
                        warn!(path = %path.display(), error = %error, "cannot read file");
                        summary.failed += 1;
                        continue;
                    }
                }
                doc.set_file_path(Some(target.to_path_buf()));
                repo.save_document(&doc)?;
                changed.push(doc.id());
                summary.success += 1;
            }

            SyncEngine::shared(repo, index, files).sync_documents(&changed)?;
            info!(
                success = summary.success,
                failed = summary.failed,
                skipped = summary.skipped,
                "migration finished"
            );
            Ok(summary)
        })
    }

    /// Rebuilds the index from the file tree alone, ignoring the repository.
    pub fn rebuild_index_from_files<P>(&self, progress: &mut P) -> Result<BuildResult>
    where
        P: ProgressReporter + ?Sized,
    {
        self.run_pass("index rebuild", |_, index, _| {
            let mut tracking = Tracking::new(&self.inner.status, progress);
            Ok(IndexBuilder::new(&self.inner.files).rebuild_with_progress(index, &mut tracking)?)
        })
    }

    /// Runs a full sync on a worker thread.
    pub fn spawn_full_sync(&self) -> JoinHandle<Result<SyncReport>> {
        let library = self.clone();
        std::thread::spawn(move || library.perform_full_sync())
    }

    pub fn spawn_quick_sync(&self) -> JoinHandle<Result<SyncReport>> {
        let library = self.clone();
        std::thread::spawn(move || library.perform_quick_sync())
    }

    pub fn spawn_maintenance(&self, auto_fix: bool) -> JoinHandle<Result<MaintenanceReport>> {
        let library = self.clone();
        std::thread::spawn(move || library.run_full_maintenance(auto_fix))
    }

    /// Asks the running pass, if any, to stop after its current item.
    pub fn cancel_current_pass(&self) -> bool {
        match lock(&self.inner.current).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    // ===== Observable state =====

    /// The pass currently running, `None` when idle.
    pub fn status(&self) -> Option<PassStatus> {
        lock(&self.inner.status).clone()
    }

    /// Start time of the last completed sync pass.
    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(lock(&self.inner.index).last_sync()?)
    }

    /// The report of the last maintenance pass run by this handle.
    pub fn last_maintenance_report(&self) -> Option<MaintenanceReport> {
        lock(&self.inner.last_report).clone()
    }

    // ===== Queries =====

    /// Every folder path, `/`-separated, including empty folders.
    pub fn get_all_folders(&self) -> Result<Vec<String>> {
        let folders = lock(&self.inner.repo).list_folders()?;
        let planner = PathPlanner::new(&folders, &[])?;
        let mut paths: Vec<String> = folders
            .iter()
            .filter_map(|f| planner.folder_dir(&f.id()))
            .map(folder_string)
            .chain(lock(&self.inner.index).folders()?)
            .filter(|p| !p.is_empty())
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Live documents directly inside `folder` (`""` for root level).
    pub fn get_notes(&self, folder: &str) -> Result<Vec<IndexRecord>> {
        Ok(lock(&self.inner.index).list_in_folder(folder.trim_matches('/'))?)
    }

    pub fn get_all_notes(&self) -> Result<Vec<IndexRecord>> {
        Ok(lock(&self.inner.index).list_all()?)
    }

    pub fn get_trashed_notes(&self) -> Result<Vec<IndexRecord>> {
        Ok(lock(&self.inner.index).list_trashed()?)
    }

    pub fn search(&self, query: &str) -> Result<Vec<IndexRecord>> {
        Ok(lock(&self.inner.index).search(query)?)
    }

    pub fn total_word_count(&self) -> Result<u64> {
        Ok(lock(&self.inner.index).aggregate_word_count()?)
    }

    /// Every document file under the root, outside the trash.
    pub fn scan_all_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.inner.files.list_all_document_files()?)
    }

    pub fn get_storage_stats(&self) -> Result<StorageStats> {
        let mut index = lock(&self.inner.index);
        MaintenanceEngine::shared(&self.inner.repo, &mut *index, &self.inner.files).storage_stats()
    }

    pub fn verify_file_integrity(&self) -> Result<FileIntegrity> {
        let mut index = lock(&self.inner.index);
        MaintenanceEngine::shared(&self.inner.repo, &mut *index, &self.inner.files)
            .verify_file_integrity()
    }

    // ===== Documents =====

    /// Creates a document in the repository.
    ///
    /// File-backed documents get their (empty) file straight away since the
    /// repository holds none of their content; every other mode is
    /// materialised and indexed by the next sync.
    pub fn create_document(
        &self,
        title: &str,
        folder: Option<FolderId>,
        mode: StorageMode,
    ) -> Result<Document> {
        self.run_pass("create document", |repo, _, _| {
            if let Some(folder) = folder
                && repo.get_folder(&folder)?.is_none()
            {
                return Err(Error::FolderNotFound(folder.to_string()));
            }
            let mut doc = Document::new(DocumentId::new(), title, folder, Utc::now());
            doc.set_storage_mode(mode);
            repo.insert_document(&doc)?;

            if mode == StorageMode::File {
                let plan = LibraryPlan::load(&*repo)?;
                let target = plan
                    .planner
                    .path_for(&doc.id())
                    .map(Path::to_path_buf)
                    .ok_or_else(|| Error::Invalid(format!("{} has no resolvable path", doc)))?;
                if let Err(err) = materialize(&self.inner.files, &doc, &target) {
                    repo.delete_document(&doc.id())?;
                    return Err(err.into());
                }
                doc.set_file_path(Some(target));
                repo.save_document(&doc)?;
            }
            info!(id = %doc.id(), title = doc.title(), mode = %mode, "created document");
            Ok(doc)
        })
    }

    pub fn get_document(&self, id: &DocumentId) -> Result<Document> {
        lock(&self.inner.repo)
            .get_document(id)?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    /// Finds a document by full identifier or unique prefix.
    pub fn find_document(&self, id_or_prefix: &str) -> Result<Document> {
        let query = id_or_prefix.trim();
        if let Ok(id) = query.parse::<DocumentId>() {
            return self.get_document(&id);
        }
        let mut matches = lock(&self.inner.repo).find_by_prefix(query)?;
        match matches.len() {
            0 => Err(Error::DocumentNotFound(query.to_string())),
            1 => Ok(matches.remove(0)),
            count => Err(Error::AmbiguousId {
                prefix: query.to_string(),
                count,
            }),
        }
    }

    pub fn read_content(&self, id: &DocumentId) -> Result<ContentRead> {
        let mut repo = lock(&self.inner.repo);
        ContentAccessor::new(&mut *repo, &self.inner.files).read(id)
    }

    /// Saves new content. Durable once this returns; the disk mirror of
    /// repository-held content follows on the next sync.
    pub fn write_content(&self, id: &DocumentId, text: &str) -> Result<Document> {
        let mut repo = lock(&self.inner.repo);
        ContentAccessor::new(&mut *repo, &self.inner.files).write(id, text, Utc::now())
    }

    /// Debounced autosave over [`write_content`](Self::write_content).
    pub fn edit_session(&self) -> EditSession {
        EditSession::new(self.clone(), self.inner.options.autosave())
    }

    /// Coalesced quick-sync requests.
    pub fn sync_trigger(&self) -> SyncTrigger {
        SyncTrigger::new(self.clone(), self.inner.options.quick_sync_delay())
    }

    /// Converts a document between storage modes, moving its content to
    /// where the new mode keeps it.
    pub fn set_storage_mode(&self, id: &DocumentId, mode: StorageMode) -> Result<Document> {
        self.run_pass("storage mode", |repo, index, _| {
            let files = &self.inner.files;
            let mut doc = load(&*repo, id)?;
            if doc.is_trashed() {
                return Err(Error::Invalid(format!("{} is in the trash", doc)));
            }
            let from = doc.storage_mode();
            if from == mode {
                return Ok(doc);
            }

            if mode == StorageMode::File {
                let plan = LibraryPlan::load(&*repo)?;
                let target = plan
                    .planner
                    .path_for(id)
                    .map(Path::to_path_buf)
                    .ok_or_else(|| Error::Invalid(format!("{} has no resolvable path", doc)))?;
                let (path, body) = match OnDisk::locate(files, &doc, &target) {
                    // Hybrid reads already prefer the disk.
                    OnDisk::Present { path, parsed } if from == StorageMode::Hybrid => {
                        (path, parsed.body)
                    }
                    OnDisk::Present { path, .. } => {
                        files.write_document(
                            &path,
                            &DocumentHeader::for_document(&doc),
                            doc.content(),
                        )?;
                        (path, doc.content().to_string())
                    }
                    OnDisk::Absent => {
                        materialize(files, &doc, &target)?;
                        (target, doc.content().to_string())
                    }
                    OnDisk::Unreadable { error, .. } => return Err(error.into()),
                };
                doc.record_counts_for(&body);
                doc.clear_repository_content();
                doc.set_file_path(Some(path));
            } else if from == StorageMode::File {
                let body = match doc.file_path().map(Path::to_path_buf) {
                    Some(path) => files.read_document(&path)?.body,
                    None => String::new(),
                };
                let modified = doc.modified();
                doc.set_content(body, modified);
            }

            doc.set_storage_mode(mode);
            repo.save_document(&doc)?;
            SyncEngine::new(&mut *repo, &mut *index, files).sync_documents(&[*id])?;
            info!(id = %id, from = %from, to = %mode, "changed storage mode");
            load(&*repo, id)
        })
    }

    /// Retitles a document. Its file is moved to the new path in the same call.
    pub fn rename_document(&self, id: &DocumentId, title: &str) -> Result<Document> {
        self.run_pass("rename document", |repo, index, _| {
            let mut doc = load(&*repo, id)?;
            doc.set_title(title, Utc::now());
            repo.save_document(&doc)?;
            SyncEngine::new(&mut *repo, &mut *index, &self.inner.files).sync_documents(&[*id])?;
            load(&*repo, id)
        })
    }

    /// Files a document under `folder` (`None` for root level).
    pub fn move_document(&self, id: &DocumentId, folder: Option<FolderId>) -> Result<Document> {
        self.run_pass("move document", |repo, index, _| {
            if let Some(folder) = folder
                && repo.get_folder(&folder)?.is_none()
            {
                return Err(Error::FolderNotFound(folder.to_string()));
            }
            let mut doc = load(&*repo, id)?;
            doc.set_folder(folder, Utc::now());
            repo.save_document(&doc)?;
            SyncEngine::new(&mut *repo, &mut *index, &self.inner.files).sync_documents(&[*id])?;
            load(&*repo, id)
        })
    }

    // ===== Folders =====

    /// Creates every missing folder along a `/`-separated path and returns
    /// the innermost one.
    pub fn create_folder(&self, path: &str) -> Result<Folder> {
        self.run_pass("create folder", |repo, _, _| {
            let id = ensure_folder_path(&mut *repo, path)?
                .ok_or_else(|| Error::Invalid("folder path is empty".into()))?;
            let folders = repo.list_folders()?;
            let planner = PathPlanner::new(&folders, &[])?;
            if let Some(dir) = planner.folder_dir(&id)
                && let Err(err) = self.inner.files.create_folder(dir)
            {
                warn!(path = %dir.display(), error = %err, "could not create folder directory");
            }
            repo.get_folder(&id)?
                .ok_or_else(|| Error::FolderNotFound(id.to_string()))
        })
    }

    /// Looks up a folder by its `/`-separated path, case-insensitively.
    pub fn find_folder(&self, path: &str) -> Result<Folder> {
        let repo = lock(&self.inner.repo);
        let folders = repo.list_folders()?;
        find_folder_in(&folders, path).ok_or_else(|| Error::FolderNotFound(path.to_string()))
    }

    /// Renames a folder and relocates every file below it, all or nothing.
    ///
    /// Returns the documents whose path changed.
    pub fn rename_folder(&self, id: &FolderId, name: &str) -> Result<Vec<DocumentId>> {
        self.run_pass("rename folder", |repo, index, _| {
            let mut folder = repo
                .get_folder(id)?
                .ok_or_else(|| Error::FolderNotFound(id.to_string()))?;
            folder
                .rename(name, Utc::now())
                .map_err(|e| Error::Invalid(e.to_string()))?;
            self.cascade(repo, index, &folder)
        })
    }

    /// Moves a folder under `parent` (`None` for root level).
    pub fn move_folder(&self, id: &FolderId, parent: Option<FolderId>) -> Result<Vec<DocumentId>> {
        self.run_pass("move folder", |repo, index, _| {
            let mut folder = repo
                .get_folder(id)?
                .ok_or_else(|| Error::FolderNotFound(id.to_string()))?;
            if let Some(parent) = parent
                && repo.get_folder(&parent)?.is_none()
            {
                return Err(Error::FolderNotFound(parent.to_string()));
            }
            folder.set_parent(parent, Utc::now());
            self.cascade(repo, index, &folder)
        })
    }

    fn cascade(
        &self,
        repo: &mut SqliteRepository,
        index: &mut SqliteIndex,
        folder: &Folder,
    ) -> Result<Vec<DocumentId>> {
        let files = &self.inner.files;
        let plan = RenamePlan::compute(&*repo, files, folder)?;
        let ids = plan.execute(&mut *repo, files)?;
        SyncEngine::new(&mut *repo, &mut *index, files).sync_documents(&ids)?;
        Ok(ids)
    }

    // ===== Trash =====

    /// Moves a document's file into the trash and flags it trashed. Its
    /// identifier, metadata and index record survive.
    pub fn trash_document(&self, id: &DocumentId) -> Result<Document> {
        self.run_pass("trash", |repo, index, _| {
            let files = &self.inner.files;
            let mut doc = load(&*repo, id)?;
            if doc.is_trashed() {
                return Ok(doc);
            }
            let original = doc.file_path().map(Path::to_path_buf);
            let trash_path = match &original {
                Some(path) if files.exists(path) => Some(files.move_to_trash(path)?),
                _ => None,
            };
            doc.mark_trashed(Utc::now(), trash_path.clone());
            if let Err(err) = repo.save_document(&doc) {
                if let (Some(from), Some(to)) = (&trash_path, &original)
                    && let Err(undo) = files.restore_from_trash(from, to)
                {
                    warn!(path = %from.display(), error = %undo, "could not move file back out of the trash");
                }
                return Err(err.into());
            }
            SyncEngine::new(&mut *repo, &mut *index, files).sync_documents(&[*id])?;
            info!(id = %id, "trashed document");
            Ok(doc)
        })
    }

    /// Brings a trashed document back to its canonical path.
    ///
    /// A document whose folder no longer exists is restored at root level.
    pub fn restore_document(&self, id: &DocumentId) -> Result<Document> {
        self.run_pass("restore", |repo, index, _| {
            let files = &self.inner.files;
            let doc = load(&*repo, id)?;
            if !doc.is_trashed() {
                return Ok(doc);
            }
            let trash_path = doc.file_path().map(Path::to_path_buf);

            let mut restored = doc.clone();
            restored.mark_restored(None);
            if let Some(folder) = restored.folder()
                && repo.get_folder(&folder)?.is_none()
            {
                restored.set_folder(None, Utc::now());
            }
            let folders = repo.list_folders()?;
            let mut documents = repo.list_documents(false)?;
            documents.push(restored.clone());
            let target = PathPlanner::new(&folders, &documents)?
                .path_for(id)
                .map(Path::to_path_buf)
                .ok_or_else(|| Error::Invalid(format!("{} has no resolvable path", doc)))?;

            match trash_path {
                Some(from) if files.exists(&from) => {
                    files.restore_from_trash(&from, &target)?;
                    restored.mark_restored(Some(target));
                }
                Some(from) if !doc.storage_mode().repository_holds_content() => {
                    return Err(FileStoreError::NotFound { path: from }.into());
                }
                _ => restored.mark_restored(None),
            }

            repo.save_document(&restored)?;
            SyncEngine::new(&mut *repo, &mut *index, files).sync_documents(&[*id])?;
            info!(id = %id, "restored document");
            load(&*repo, id)
        })
    }

    /// Permanently deletes a trashed document: trash file first, then the
    /// repository record, then the index record.
    ///
    /// # Errors
    ///
    /// Returns `NotConfirmed` without confirmation and `Invalid` for a
    /// document that is not in the trash. An I/O failure deleting the file
    /// stops the purge before the repository is touched.
    pub fn purge_document(&self, id: &DocumentId, confirm: Confirmation) -> Result<()> {
        confirm.require("purge")?;
        self.run_pass("purge", |repo, index, _| {
            let doc = load(&*repo, id)?;
            if !doc.is_trashed() {
                return Err(Error::Invalid(format!("{} is not in the trash", doc)));
            }
            purge(&self.inner.files, repo, index, &doc)
        })
    }

    /// Purges every trashed document and deletes every remaining trash
    /// file, after attempting a safety backup.
    pub fn empty_trash(&self, confirm: Confirmation) -> Result<EmptyTrashReport> {
        confirm.require("empty trash")?;
        self.run_pass("empty trash", |repo, index, _| {
            let files = &self.inner.files;
            let mut report = EmptyTrashReport {
                backup: self.safety_backup(&*repo, "empty trash")?,
                ..EmptyTrashReport::default()
            };

            for doc in repo.list_documents(true)?.iter().filter(|d| d.is_trashed()) {
                match purge(files, repo, index, doc) {
                    Ok(()) => report.purged += 1,
                    Err(err) => {
                        warn!(id = %doc.id(), error = %err, "could not purge document");
                        report
                            .errors
                            .push(ItemError::new(doc.id(), err.kind(), err.to_string()));
                    }
                }
            }

            for path in files.list_trash_files()? {
                match files.permanently_delete(&path) {
                    Ok(()) => {
                        files.remove_empty_dirs(&path);
                        report.removed_files += 1;
                    }
                    Err(err) if err.is_not_found() => {}
                    Err(err) => report.errors.push(ItemError::from_files(path.display(), &err)),
                }
            }
            info!(
                purged = report.purged,
                removed_files = report.removed_files,
                "emptied trash"
            );
            Ok(report)
        })
    }

    /// Copies the file tree and the repository into a fresh snapshot.
    ///
    /// Best-effort unless `require_backup` is set: a failure is logged and
    /// `None` returned.
    fn safety_backup(&self, repo: &dyn DocumentRepository, reason: &str) -> Result<Option<PathBuf>> {
        let backups = self.inner.data_dir.join("backups");
        let result = create_backup(&self.inner.files, &backups, reason, Utc::now()).map(|b| {
            if let Err(err) = repo.backup_to(&b.path.join("library.db")) {
                warn!(error = %err, "repository backup failed; file snapshot kept");
            }
            b
        });
        match result {
            Ok(backup) => Ok(Some(backup.path)),
            Err(err) if self.inner.options.backup_required() => Err(Error::BackupFailed(err)),
            Err(err) => {
                warn!(error = %err, "safety backup failed; continuing");
                Ok(None)
            }
        }
    }

    // ===== Orphans =====

    /// Turns an orphaned file into a document.
    ///
    /// A file with front-matter keeps its identifier and metadata. A bare
    /// file gets a new identifier and its header written in place. Folders
    /// along the file's directory are created as needed.
    pub fn adopt_orphan_file(&self, path: &Path) -> Result<Document> {
        if FileStore::is_in_trash(path) {
            return Err(Error::Invalid(format!(
                "{} is in the trash; restore it first",
                path.display()
            )));
        }
        self.run_pass("adopt orphan", |repo, index, _| {
            let files = &self.inner.files;
            let dir = path.parent().map(folder_string).unwrap_or_default();
            let folder = ensure_folder_path(&mut *repo, &dir)?;

            let doc = match files.read_document(path) {
                Ok(parsed) => {
                    let header = parsed.header;
                    if let Some(existing) = repo.get_document(&header.id)? {
                        return Err(Error::Invalid(format!(
                            "{} belongs to {}",
                            path.display(),
                            existing
                        )));
                    }
                    Document::builder(header.id, &header.title, header.created)
                        .modified(header.modified)
                        .tags(header.tags.clone())
                        .status(header.status_or_default())
                        .content(parsed.body)
                        .folder(folder)
                        .file_path(Some(path.to_path_buf()))
                        .build()
                }
                Err(FileStoreError::Parse { .. }) => {
                    let text = files.read(path)?;
                    let modified = files.modified_time(path)?;
                    let title = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let mut doc = Document::new(DocumentId::new(), &title, folder, modified);
                    doc.set_content(text, modified);
                    files.write_document(path, &DocumentHeader::for_document(&doc), doc.content())?;
                    doc.set_file_path(Some(path.to_path_buf()));
                    doc
                }
                Err(err) => return Err(err.into()),
            };

            repo.insert_document(&doc)?;
            SyncEngine::new(&mut *repo, &mut *index, files).sync_documents(&[doc.id()])?;
            info!(id = %doc.id(), path = %path.display(), "adopted orphaned file");
            load(&*repo, &doc.id())
        })
    }

    /// Deletes a file that no document owns.
    ///
    /// Refuses a file that is the recorded file of a document; a second copy
    /// claiming a known identifier may be deleted.
    pub fn delete_orphan_file(&self, path: &Path, confirm: Confirmation) -> Result<()> {
        confirm.require("delete orphaned file")?;
        self.run_pass("delete orphan", |repo, index, _| {
            let files = &self.inner.files;
            let claimed = match files.read_document(path) {
                Ok(parsed) => Some(parsed.header.id),
                Err(err) if err.is_not_found() => return Err(err.into()),
                Err(_) => None,
            };
            if let Some(id) = claimed {
                match repo.get_document(&id)? {
                    Some(doc) if doc.file_path() == Some(path) => {
                        return Err(Error::Invalid(format!(
                            "{} is the file of {}",
                            path.display(),
                            doc
                        )));
                    }
                    Some(_) => {}
                    None => {
                        if index.get(&id)?.is_some_and(|r| r.path() == Some(path)) {
                            index.remove(&id)?;
                        }
                    }
                }
            }
            files.permanently_delete(path)?;
            files.remove_empty_dirs(path);
            info!(path = %path.display(), "deleted orphaned file");
            Ok(())
        })
    }

    // ===== Internals =====

    fn run_pass<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteRepository, &mut SqliteIndex, CancellationToken) -> Result<T>,
    {
        self.in_pass(operation, |token| {
            let mut index = lock(&self.inner.index);
            let mut repo = lock(&self.inner.repo);
            f(&mut *repo, &mut *index, token)
        })
    }

    /// Runs a pass that locks the repository itself, one unit of work at a
    /// time.
    fn run_shared_pass<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Mutex<dyn DocumentRepository>, &mut SqliteIndex, CancellationToken) -> Result<T>,
    {
        self.in_pass(operation, |token| {
            let mut index = lock(&self.inner.index);
            let repo: &Mutex<dyn DocumentRepository> = &self.inner.repo;
            f(repo, &mut *index, token)
        })
    }

    fn in_pass<T>(
        &self,
        operation: &str,
        f: impl FnOnce(CancellationToken) -> Result<T>,
    ) -> Result<T> {
        let _pass = lock(&self.inner.pass);
        let token = CancellationToken::new();
        *lock(&self.inner.current) = Some(token.clone());
        *lock(&self.inner.status) = Some(PassStatus {
            operation: operation.to_string(),
            fraction: 0.0,
        });

        let result = f(token);

        *lock(&self.inner.status) = None;
        *lock(&self.inner.current) = None;
        result
    }
}

fn load(repo: &dyn DocumentRepository, id: &DocumentId) -> Result<Document> {
    repo.get_document(id)?
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
}

fn purge(
    files: &FileStore,
    repo: &mut SqliteRepository,
    index: &mut SqliteIndex,
    doc: &Document,
) -> Result<()> {
    if let Some(path) = doc.file_path() {
        match files.permanently_delete(path) {
            Ok(()) => files.remove_empty_dirs(path),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }
    }
    repo.delete_document(&doc.id())?;
    index.remove(&doc.id())?;
    info!(id = %doc.id(), "purged document");
    Ok(())
}

fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

fn same_name(folder: &Folder, component: &str) -> bool {
    sanitize_component(folder.name()).to_lowercase() == sanitize_component(component).to_lowercase()
}

fn find_folder_in(folders: &[Folder], path: &str) -> Option<Folder> {
    let mut parent: Option<FolderId> = None;
    let mut found = None;
    for component in path_components(path) {
        let folder = folders
            .iter()
            .find(|f| f.parent() == parent && same_name(f, component))?;
        parent = Some(folder.id());
        found = Some(folder.clone());
    }
    found
}

/// Walks a folder path, creating missing folders. `None` for an empty path.
fn ensure_folder_path(repo: &mut dyn DocumentRepository, path: &str) -> Result<Option<FolderId>> {
    let mut folders = repo.list_folders()?;
    let mut parent: Option<FolderId> = None;
    for component in path_components(path) {
        let existing = folders
            .iter()
            .find(|f| f.parent() == parent && same_name(f, component))
            .map(Folder::id);
        let id = match existing {
            Some(id) => id,
            None => {
                let folder = Folder::new(component, parent, Utc::now())
                    .map_err(|e| Error::Invalid(e.to_string()))?;
                repo.insert_folder(&folder)?;
                info!(name = folder.name(), "created folder");
                let id = folder.id();
                folders.push(folder);
                id
            }
        };
        parent = Some(id);
    }
    Ok(parent)
}
