//! Health checks and repairs across the repository, file tree and index.

use super::checks::{self, Snapshot};
use super::report::{CheckDepth, MaintenanceReport};
use crate::domain::{DocumentId, FileIntegrity, IssueFix, MaintenanceIssue, StorageMode, StorageStats};
use crate::error::{ErrorKind, ItemError, Result};
use crate::index::IndexStore;
use crate::infra::{DocumentHeader, FileStore};
use crate::progress::{CancellationToken, ItemOutcome, NoopReporter, ProgressReporter};
use crate::repository::{DocumentRepository, RepositoryAccess};
use crate::sync::SyncEngine;
use chrono::Utc;
use std::sync::Mutex;
use tracing::{debug, info, warn};

type FixResult = std::result::Result<(), ItemError>;

/// Detects drift between the three stores and applies safe repairs.
///
/// Destructive repairs never happen here. Orphaned and dangling files are
/// reported only; deleting them is a confirmed operation on `Library`.
pub struct MaintenanceEngine<'a> {
    repo: RepositoryAccess<'a>,
    index: &'a mut dyn IndexStore,
    files: &'a FileStore,
    cancel: CancellationToken,
}

impl<'a> MaintenanceEngine<'a> {
    pub fn new(
        repo: &'a mut dyn DocumentRepository,
        index: &'a mut dyn IndexStore,
        files: &'a FileStore,
    ) -> Self {
        Self::with_access(RepositoryAccess::Exclusive(repo), index, files)
    }

    /// An engine that locks the repository per read and per fix.
    pub fn shared(
        repo: &'a Mutex<dyn DocumentRepository>,
        index: &'a mut dyn IndexStore,
        files: &'a FileStore,
    ) -> Self {
        Self::with_access(RepositoryAccess::Shared(repo), index, files)
    }

    pub fn with_access(
        repo: RepositoryAccess<'a>,
        index: &'a mut dyn IndexStore,
        files: &'a FileStore,
    ) -> Self {
        Self {
            repo,
            index,
            files,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Looks for critical issues only: duplicate identifiers and documents
    /// whose content is nowhere.
    pub fn quick_health_check(&mut self) -> Result<MaintenanceReport> {
        let mut report = MaintenanceReport::new(CheckDepth::Quick, Utc::now());
        let snapshot = Snapshot::read_quick(&mut self.repo, self.files)?;
        report.issues = checks::critical_issues(&snapshot)
            .into_iter()
            .map(MaintenanceIssue::new)
            .collect();
        info!(issues = report.issues.len(), "quick health check finished");
        Ok(report)
    }

    pub fn run_full_maintenance(&mut self, auto_fix: bool) -> Result<MaintenanceReport> {
        self.run_full_maintenance_with_progress(auto_fix, &mut NoopReporter)
    }

    /// Scans for the whole issue taxonomy and, with `auto_fix`, applies every
    /// safe fix before scanning again.
    ///
    /// # Errors
    ///
    /// Only structural failures are returned; a fix that fails is recorded
    /// in the report and the pass moves on.
    pub fn run_full_maintenance_with_progress<P>(
        &mut self,
        auto_fix: bool,
        progress: &mut P,
    ) -> Result<MaintenanceReport>
    where
        P: ProgressReporter + ?Sized,
    {
        let mut report = MaintenanceReport::new(CheckDepth::Full, Utc::now());
        info!(auto_fix, "full maintenance started");

        let mut snapshot = Snapshot::read_full(&mut self.repo, &*self.index, self.files)?;
        let mut issues: Vec<MaintenanceIssue> = checks::all_issues(&snapshot)
            .into_iter()
            .map(MaintenanceIssue::new)
            .collect();

        if auto_fix {
            let fixable: Vec<MaintenanceIssue> =
                issues.iter().filter(|i| i.can_auto_fix).cloned().collect();
            progress.on_start("maintenance", fixable.len());
            for issue in fixable {
                if self.cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                let Some(fix) = &issue.fix else {
                    continue;
                };
                let outcome = match self.apply(fix)? {
                    Ok(()) => {
                        debug!(issue = %issue, "fixed");
                        report.fixed.push(issue.clone());
                        ItemOutcome::Changed
                    }
                    Err(err) => {
                        warn!(issue = %issue, error = %err.message, "fix failed");
                        let outcome = ItemOutcome::Failed(err.message.clone());
                        report.errors.push(err);
                        outcome
                    }
                };
                progress.on_item(&issue.description, &outcome);
            }

            if !report.fixed.is_empty() {
                snapshot = Snapshot::read_full(&mut self.repo, &*self.index, self.files)?;
                issues = checks::all_issues(&snapshot)
                    .into_iter()
                    .map(MaintenanceIssue::new)
                    .collect();
            }
        }

        report.storage = Some(checks::storage_stats(&snapshot.documents));
        report.issues = issues;
        progress.on_complete(report.fixed.len(), report.errors.len());
        info!(
            issues = report.issues.len(),
            fixed = report.fixed.len(),
            errors = report.errors.len(),
            cancelled = report.cancelled,
            "full maintenance finished"
        );
        Ok(report)
    }

    /// Applies the fix for one issue.
    ///
    /// Returns `false` when the issue has no fix or the fix failed. Fixing an
    /// issue that is already gone is a no-op that returns `true`.
    pub fn fix_single_issue(&mut self, issue: &MaintenanceIssue) -> Result<bool> {
        let Some(fix) = &issue.fix else {
            return Ok(false);
        };
        Ok(match self.apply(fix)? {
            Ok(()) => true,
            Err(err) => {
                warn!(issue = %issue, error = %err.message, "fix failed");
                false
            }
        })
    }

    pub fn storage_stats(&mut self) -> Result<StorageStats> {
        let documents = self.repo.lock().list_documents(true)?;
        Ok(checks::storage_stats(&documents))
    }

    pub fn verify_file_integrity(&mut self) -> Result<FileIntegrity> {
        let documents = self.repo.lock().list_documents(false)?;
        Ok(checks::file_integrity(&documents, self.files))
    }

    fn apply(&mut self, fix: &IssueFix) -> Result<FixResult> {
        match *fix {
            IssueFix::RematerializeFile { id } | IssueFix::RefreshIndexRecord { id } => {
                self.resync(id)
            }
            IssueFix::RestoreTrashFile { id } => self.restore_trash_file(id),
            IssueFix::RemoveIndexRecord { id } => {
                if self.repo.lock().get_document(&id)?.is_some() {
                    return self.resync(id);
                }
                if self.index.remove(&id)? {
                    debug!(id = %id, "removed index record");
                }
                Ok(Ok(()))
            }
            IssueFix::PromoteToRoot { id } => self.promote_to_root(id),
            IssueFix::ResolveDrift { id } => self.resolve_drift(id),
        }
    }

    /// Re-derives one document's file and index record through the sync engine.
    fn resync(&mut self, id: DocumentId) -> Result<FixResult> {
        let report = SyncEngine::with_access(self.repo.reborrow(), &mut *self.index, self.files)
            .sync_documents(&[id])?;
        Ok(match report.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        })
    }

    fn restore_trash_file(&mut self, id: DocumentId) -> Result<FixResult> {
        let Some(doc) = self.repo.lock().get_document(&id)? else {
            return Ok(Ok(()));
        };
        let Some(path) = doc.file_path().filter(|_| doc.is_trashed()) else {
            return Ok(Ok(()));
        };
        if self.files.exists(path) {
            let ours = self
                .files
                .read_document(path)
                .is_ok_and(|p| p.header.id == id);
            if ours {
                return Ok(Ok(()));
            }
            return Ok(Err(ItemError::new(
                path.display(),
                ErrorKind::IdentifierCollision,
                "trash path is taken by another file",
            )));
        }
        if !doc.storage_mode().repository_holds_content() {
            return Ok(Err(ItemError::new(
                id,
                ErrorKind::NotFound,
                "no repository content to restore from",
            )));
        }
        if let Err(err) =
            self.files
                .write_document(path, &DocumentHeader::for_document(&doc), doc.content())
        {
            return Ok(Err(ItemError::from_files(id, &err)));
        }
        info!(id = %id, path = %path.display(), "restored trash file from repository");
        self.resync(id)
    }

    fn promote_to_root(&mut self, id: DocumentId) -> Result<FixResult> {
        {
            let mut repo = self.repo.lock();
            let Some(mut doc) = repo.get_document(&id)? else {
                return Ok(Ok(()));
            };
            let Some(folder) = doc.folder() else {
                return Ok(Ok(()));
            };
            if repo.get_folder(&folder)?.is_some() {
                return Ok(Ok(()));
            }
            doc.set_folder(None, Utc::now());
            repo.save_document(&doc)?;
            info!(id = %id, folder = %folder, "promoted document to root level");
        }
        self.resync(id)
    }

    fn resolve_drift(&mut self, id: DocumentId) -> Result<FixResult> {
        if let Err(err) = self.settle_drift(id)? {
            return Ok(Err(err));
        }
        self.resync(id)
    }

    /// Settles a hybrid disagreement: the later side wins, ties go to the
    /// repository. Anything that is not drift is left to the resync.
    fn settle_drift(&mut self, id: DocumentId) -> Result<FixResult> {
        let mut repo = self.repo.lock();
        let Some(mut doc) = repo.get_document(&id)? else {
            return Ok(Ok(()));
        };
        if doc.is_trashed() || doc.storage_mode() != StorageMode::Hybrid {
            return Ok(Ok(()));
        }
        let Some(path) = doc.file_path().map(|p| p.to_path_buf()) else {
            return Ok(Ok(()));
        };
        let parsed = match self.files.read_document(&path) {
            Ok(parsed) if parsed.header.id == id => parsed,
            Ok(_) => return Ok(Ok(())),
            Err(err) if err.is_not_found() => return Ok(Ok(())),
            Err(err) => return Ok(Err(ItemError::from_files(id, &err))),
        };
        if parsed.body == doc.content() {
            return Ok(Ok(()));
        }

        let file_time = match self.files.modified_time(&path) {
            Ok(t) => t,
            Err(err) => return Ok(Err(ItemError::from_files(id, &err))),
        };
        if file_time > doc.modified() {
            info!(id = %id, "drift resolved in favour of the file");
            doc.set_content(parsed.body, file_time);
            repo.save_document(&doc)?;
        } else {
            info!(id = %id, "drift resolved in favour of the repository");
            if let Err(err) =
                self.files
                    .write_document(&path, &DocumentHeader::for_document(&doc), doc.content())
            {
                return Ok(Err(ItemError::from_files(id, &err)));
            }
        }
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, Folder, IssueKind};
    use crate::index::SqliteIndex;
    use crate::repository::SqliteRepository;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Stores {
        _dir: TempDir,
        repo: SqliteRepository,
        index: SqliteIndex,
        files: FileStore,
    }

    impl Stores {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let files = FileStore::open(dir.path()).unwrap();
            Self {
                _dir: dir,
                repo: SqliteRepository::open_in_memory().unwrap(),
                index: SqliteIndex::open_in_memory().unwrap(),
                files,
            }
        }

        fn engine(&mut self) -> MaintenanceEngine<'_> {
            MaintenanceEngine::new(&mut self.repo, &mut self.index, &self.files)
        }

        fn sync(&mut self) {
            SyncEngine::new(&mut self.repo, &mut self.index, &self.files)
                .full_sync()
                .unwrap();
        }

        fn add(&mut self, title: &str, content: &str, mode: StorageMode) -> Document {
            let mut doc = Document::new(DocumentId::new(), title, None, Utc::now());
            doc.set_content(content, Utc::now());
            doc.set_storage_mode(mode);
            self.repo.insert_document(&doc).unwrap();
            doc
        }
    }

    fn kinds(report: &MaintenanceReport) -> Vec<IssueKind> {
        report.issues.iter().map(|i| i.kind.clone()).collect()
    }

    // ===== Scans =====

    #[test]
    fn synced_library_is_healthy() {
        let mut s = Stores::new();
        s.add("One", "first", StorageMode::Repository);
        s.add("Two", "second", StorageMode::Hybrid);
        s.sync();

        let report = s.engine().run_full_maintenance(false).unwrap();
        assert!(report.is_healthy(), "{:?}", report.issues);
        let storage = report.storage.unwrap();
        assert_eq!(storage.total, 2);
        assert_eq!(storage.hybrid, 1);
    }

    #[test]
    fn orphaned_file_is_reported_and_never_fixed() {
        let mut s = Stores::new();
        s.files.write(Path::new("stray.md"), "no header").unwrap();
        s.sync();

        let report = s.engine().run_full_maintenance(true).unwrap();
        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert!(matches!(issue.kind, IssueKind::OrphanedFile { id: None, .. }));
        assert!(!issue.can_auto_fix);
        assert!(s.files.exists(Path::new("stray.md")));
    }

    #[test]
    fn quick_check_reports_only_critical_issues() {
        let mut s = Stores::new();
        let mut doc = s.add("Lost", "", StorageMode::File);
        doc.set_file_path(Some(PathBuf::from("Lost.md")));
        s.repo.save_document(&doc).unwrap();
        s.files.write(Path::new("stray.md"), "no header").unwrap();

        let report = s.engine().quick_health_check().unwrap();
        assert_eq!(kinds(&report), vec![IssueKind::NoStorage { id: doc.id() }]);
        assert!(report.has_critical());
        assert!(report.storage.is_none());
    }

    // ===== Auto-fix =====

    #[test]
    fn auto_fix_rematerialises_missing_file() {
        let mut s = Stores::new();
        let doc = s.add("Notes", "keep me", StorageMode::Repository);
        s.sync();
        std::fs::remove_file(s.files.root().join("Notes.md")).unwrap();

        let report = s.engine().run_full_maintenance(true).unwrap();
        assert!(report.is_healthy(), "{:?}", report.issues);
        assert!(
            report
                .fixed
                .iter()
                .any(|i| i.kind == IssueKind::MissingFile {
                    id: doc.id(),
                    path: PathBuf::from("Notes.md"),
                })
        );
        assert_eq!(
            s.files.read_document(Path::new("Notes.md")).unwrap().body,
            "keep me"
        );
    }

    #[test]
    fn broken_folder_reference_promoted_to_root() {
        let mut s = Stores::new();
        let folder = Folder::new("Gone", None, Utc::now()).unwrap();
        s.repo.insert_folder(&folder).unwrap();
        let mut doc = Document::new(DocumentId::new(), "Child", Some(folder.id()), Utc::now());
        doc.set_content("x", Utc::now());
        s.repo.insert_document(&doc).unwrap();
        s.sync();
        // Simulate a folder row lost without its documents being moved.
        doc.set_folder(Some(crate::domain::FolderId::new()), Utc::now());
        s.repo.save_document(&doc).unwrap();

        let report = s.engine().run_full_maintenance(true).unwrap();
        assert!(report.is_healthy(), "{:?}", report.issues);
        let stored = s.repo.get_document(&doc.id()).unwrap().unwrap();
        assert_eq!(stored.folder(), None);
        assert_eq!(stored.file_path(), Some(Path::new("Child.md")));
    }

    #[test]
    fn orphaned_index_record_removed() {
        let mut s = Stores::new();
        let doc = s.add("Temp", "x", StorageMode::Repository);
        s.sync();
        s.repo.delete_document(&doc.id()).unwrap();
        std::fs::remove_file(s.files.root().join("Temp.md")).unwrap();

        let report = s.engine().run_full_maintenance(true).unwrap();
        assert!(report.is_healthy(), "{:?}", report.issues);
        assert!(s.index.get(&doc.id()).unwrap().is_none());
    }

    // ===== Single fixes =====

    #[test]
    fn fix_single_issue_is_idempotent() {
        let mut s = Stores::new();
        let doc = s.add("Notes", "content", StorageMode::Repository);
        s.sync();
        std::fs::remove_file(s.files.root().join("Notes.md")).unwrap();

        let report = s.engine().run_full_maintenance(false).unwrap();
        let issue = report
            .issues
            .iter()
            .find(|i| matches!(i.kind, IssueKind::MissingFile { .. }))
            .unwrap()
            .clone();

        assert!(s.engine().fix_single_issue(&issue).unwrap());
        assert!(s.engine().fix_single_issue(&issue).unwrap());
        assert!(s.files.exists(Path::new("Notes.md")));
        assert_eq!(s.index.get(&doc.id()).unwrap().unwrap().path(), Some(Path::new("Notes.md")));
    }

    #[test]
    fn issue_without_fix_returns_false() {
        let mut s = Stores::new();
        let issue = MaintenanceIssue::new(IssueKind::OrphanedFile {
            path: PathBuf::from("stray.md"),
            id: None,
        });
        assert!(!s.engine().fix_single_issue(&issue).unwrap());
    }

    #[test]
    fn drift_resolved_towards_newer_file() {
        let mut s = Stores::new();
        let mut doc = s.add("Draft", "original", StorageMode::Hybrid);
        s.sync();
        doc = s.repo.get_document(&doc.id()).unwrap().unwrap();

        // Repository edited in the past, file edited afterwards.
        doc.set_content("repository edit", Utc::now() - Duration::hours(1));
        s.repo.save_document(&doc).unwrap();
        s.files
            .write_document(
                Path::new("Draft.md"),
                &DocumentHeader::for_document(&doc),
                "disk edit",
            )
            .unwrap();

        let report = s.engine().run_full_maintenance(true).unwrap();
        let drift = report
            .issues
            .iter()
            .find(|i| matches!(i.kind, IssueKind::ContentDrift { .. }))
            .unwrap()
            .clone();
        assert!(!drift.can_auto_fix);

        assert!(s.engine().fix_single_issue(&drift).unwrap());
        let stored = s.repo.get_document(&doc.id()).unwrap().unwrap();
        assert_eq!(stored.content(), "disk edit");
        assert!(s.engine().run_full_maintenance(false).unwrap().is_healthy());
    }

    #[test]
    fn drift_tie_goes_to_repository() {
        let mut s = Stores::new();
        let doc = s.add("Draft", "original", StorageMode::Hybrid);
        s.sync();
        let mut doc = s.repo.get_document(&doc.id()).unwrap().unwrap();
        doc.set_content("repository edit", Utc::now() - Duration::hours(1));
        s.repo.save_document(&doc).unwrap();
        let doc = s.repo.get_document(&doc.id()).unwrap().unwrap();

        let path = Path::new("Draft.md");
        s.files
            .write_document(path, &DocumentHeader::for_document(&doc), "disk edit")
            .unwrap();
        std::fs::File::options()
            .write(true)
            .open(s.files.absolute(path).unwrap())
            .unwrap()
            .set_modified(doc.modified().into())
            .unwrap();
        assert_eq!(s.files.modified_time(path).unwrap(), doc.modified());

        let drift = MaintenanceIssue::new(IssueKind::ContentDrift {
            id: doc.id(),
            path: path.to_path_buf(),
        });
        assert!(s.engine().fix_single_issue(&drift).unwrap());
        let stored = s.repo.get_document(&doc.id()).unwrap().unwrap();
        assert_eq!(stored.content(), "repository edit");
        assert_eq!(s.files.read_document(path).unwrap().body, "repository edit");
    }

    #[test]
    fn cancelled_pass_applies_no_fixes() {
        let mut s = Stores::new();
        s.add("Unsynced", "x", StorageMode::Repository);
        let token = CancellationToken::new();
        token.cancel();

        let report = s
            .engine()
            .with_cancellation(token)
            .run_full_maintenance(true)
            .unwrap();
        assert!(report.cancelled);
        assert!(report.fixed.is_empty());
        assert!(!report.is_healthy());
    }

    #[test]
    fn integrity_counts_recorded_paths() {
        let mut s = Stores::new();
        s.add("Here", "a", StorageMode::Repository);
        s.add("Gone", "b", StorageMode::Repository);
        s.sync();
        std::fs::remove_file(s.files.root().join("Gone.md")).unwrap();

        let integrity = s.engine().verify_file_integrity().unwrap();
        assert_eq!(integrity, FileIntegrity { valid: 1, missing: 1 });
    }
}
