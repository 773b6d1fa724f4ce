//! Full, quick and targeted reconciliation passes.

use super::LibraryPlan;
use super::reconcile::{
    OnDisk, TreeScan, body_hash, collision, index_record_for, reconcile_files,
};
use crate::domain::{Document, DocumentId, SyncStats};
use crate::error::{ErrorKind, ItemError, Result};
use crate::index::{IndexRecord, IndexStore};
use crate::infra::{FileStore, ParsedFile};
use crate::progress::{CancellationToken, ItemOutcome, NoopReporter, ProgressReporter};
use crate::repository::{DocumentRepository, RepositoryAccess};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Which kind of pass produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Quick,
    /// A pass over an explicit set of documents, such as after a folder rename.
    Targeted,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub started: DateTime<Utc>,
    pub stats: SyncStats,
    /// Files under the root that no document claims. Never deleted by sync.
    pub orphans: Vec<PathBuf>,
    /// Hybrid documents whose repository and file content disagree.
    pub drift: Vec<DocumentId>,
    /// Identifiers claimed by more than one file.
    pub duplicates: Vec<DocumentId>,
    pub errors: Vec<ItemError>,
    /// The pass stopped early; `last_sync` was not advanced.
    pub cancelled: bool,
}

impl SyncReport {
    fn new(mode: SyncMode, started: DateTime<Utc>) -> Self {
        Self {
            mode,
            started,
            stats: SyncStats::default(),
            orphans: Vec::new(),
            drift: Vec::new(),
            duplicates: Vec::new(),
            errors: Vec::new(),
            cancelled: false,
        }
    }

    /// True when nothing needs attention.
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty()
            && self.drift.is_empty()
            && self.duplicates.is_empty()
            && self.errors.is_empty()
    }
}

/// Orchestrates reconciliation between the three stores.
///
/// Every decision is re-derived from current state, so a pass can be
/// interrupted at any point and re-run. Each document is re-read under the
/// repository lock before it is reconciled, so content written while a
/// shared pass runs is never overwritten with the pass's snapshot.
pub struct SyncEngine<'a> {
    repo: RepositoryAccess<'a>,
    index: &'a mut dyn IndexStore,
    files: &'a FileStore,
    cancel: CancellationToken,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        repo: &'a mut dyn DocumentRepository,
        index: &'a mut dyn IndexStore,
        files: &'a FileStore,
    ) -> Self {
        Self::with_access(RepositoryAccess::Exclusive(repo), index, files)
    }

    /// An engine that locks the repository per document.
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

    pub fn full_sync(&mut self) -> Result<SyncReport> {
        self.full_sync_with_progress(&mut NoopReporter)
    }

    /// Reconciles every document, file and index record.
    ///
    /// # Errors
    ///
    /// Only structural failures (root or database unavailable) are returned;
    /// per-document failures are recorded in the report.
    pub fn full_sync_with_progress<P>(&mut self, progress: &mut P) -> Result<SyncReport>
    where
        P: ProgressReporter + ?Sized,
    {
        let started = Utc::now();
        let mut report = SyncReport::new(SyncMode::Full, started);
        info!("full sync started");

        let plan = LibraryPlan::load(&*self.repo.lock())?;
        let mut scan = TreeScan::read(self.files)?;
        let records: HashMap<DocumentId, IndexRecord> = self
            .index
            .all_records()?
            .into_iter()
            .map(|r| (r.id(), r))
            .collect();
        let known: HashSet<DocumentId> = plan.documents.iter().map(Document::id).collect();

        progress.on_start("full sync", plan.documents.len());
        for doc in &plan.documents {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let existing = records.get(&doc.id());
            let outcome = if doc.is_trashed() {
                if let Some(claims) = scan.by_id.remove(&doc.id()) {
                    claimed_while_trashed(doc, claims, &mut report);
                }
                self.sync_current(doc, OnDisk::Absent, &plan, existing, &mut report)?
            } else {
                match scan.take(doc) {
                    Ok(disk) => self.sync_current(doc, disk, &plan, existing, &mut report)?,
                    Err(paths) => collided(doc, &paths, &mut report),
                }
            };
            progress.on_item(doc.title(), &outcome);
        }

        if !report.cancelled {
            // What is left in the scan belongs to no document.
            let mut orphan_ids = HashSet::new();
            for (id, claims) in scan.by_id.drain() {
                if known.contains(&id) {
                    continue;
                }
                if claims.len() > 1 {
                    report.duplicates.push(id);
                }
                orphan_ids.insert(id);
                report.orphans.extend(claims.into_iter().map(|(p, _)| p));
            }
            report.orphans.append(&mut scan.no_identifier);
            for (path, err) in scan.unreadable.drain() {
                warn!(path = %path.display(), error = %err, "cannot read file");
                report.errors.push(ItemError::from_files(path.display(), &err));
            }
            report.orphans.sort();
            for path in &report.orphans {
                debug!(path = %path.display(), "orphaned file left in place");
            }

            for id in records.keys() {
                if known.contains(id) || scan.trash_ids.contains(id) || orphan_ids.contains(id) {
                    continue;
                }
                if self.index.remove(id)? {
                    debug!(id = %id, "removed orphaned index record");
                    report.stats.files_removed += 1;
                }
            }

            self.index.set_last_sync(started)?;
        }

        self.finish(&report, progress);
        Ok(report)
    }

    pub fn quick_sync(&mut self) -> Result<SyncReport> {
        self.quick_sync_with_progress(&mut NoopReporter)
    }

    /// Reconciles only documents modified since the last completed pass.
    ///
    /// Falls back to a full sync when no pass has completed yet.
    pub fn quick_sync_with_progress<P>(&mut self, progress: &mut P) -> Result<SyncReport>
    where
        P: ProgressReporter + ?Sized,
    {
        let Some(since) = self.index.last_sync()? else {
            info!("no previous sync recorded; running full sync");
            return self.full_sync_with_progress(progress);
        };
        let started = Utc::now();
        let mut report = SyncReport::new(SyncMode::Quick, started);
        let changed = self.repo.lock().documents_modified_since(since)?;
        info!(changed = changed.len(), "quick sync started");

        self.sync_each(changed, &mut report, progress)?;
        if !report.cancelled {
            self.index.set_last_sync(started)?;
        }
        self.finish(&report, progress);
        Ok(report)
    }

    /// Reconciles the given documents only. Does not advance `last_sync`.
    pub fn sync_documents(&mut self, ids: &[DocumentId]) -> Result<SyncReport> {
        let mut report = SyncReport::new(SyncMode::Targeted, Utc::now());
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            let found = self.repo.lock().get_document(id)?;
            match found {
                Some(doc) => docs.push(doc),
                None => {
                    if self.index.remove(id)? {
                        report.stats.files_removed += 1;
                    }
                }
            }
        }
        let mut progress = NoopReporter;
        self.sync_each(docs, &mut report, &mut progress)?;
        self.finish(&report, &mut progress);
        Ok(report)
    }

    fn sync_each<P>(
        &mut self,
        docs: Vec<Document>,
        report: &mut SyncReport,
        progress: &mut P,
    ) -> Result<()>
    where
        P: ProgressReporter + ?Sized,
    {
        let plan = LibraryPlan::load(&*self.repo.lock())?;
        // Read on the first file that is not where the document says.
        let mut tree: Option<TreeScan> = None;
        progress.on_start("quick sync", docs.len());
        for doc in docs {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let existing = self.index.get(&doc.id())?;
            let outcome = if doc.is_trashed() {
                self.sync_current(&doc, OnDisk::Absent, &plan, existing.as_ref(), report)?
            } else {
                let Some(target) = plan.planner.path_for(&doc.id()) else {
                    continue;
                };
                let mut disk = OnDisk::locate(self.files, &doc, target);
                if matches!(disk, OnDisk::Absent) && doc.file_path().is_some() {
                    let mut scan = match tree.take() {
                        Some(scan) => scan,
                        None => TreeScan::read(self.files)?,
                    };
                    let found = scan.take(&doc);
                    tree = Some(scan);
                    match found {
                        Ok(moved) => disk = moved,
                        Err(paths) => {
                            let outcome = collided(&doc, &paths, report);
                            progress.on_item(doc.title(), &outcome);
                            continue;
                        }
                    }
                }
                self.sync_current(&doc, disk, &plan, existing.as_ref(), report)?
            };
            progress.on_item(doc.title(), &outcome);
        }
        Ok(())
    }

    /// Reconciles one document as the repository holds it now.
    ///
    /// The repository stays locked from the re-read until the save, and is
    /// released before progress is reported.
    fn sync_current(
        &mut self,
        snapshot: &Document,
        disk: OnDisk,
        plan: &LibraryPlan,
        existing: Option<&IndexRecord>,
        report: &mut SyncReport,
    ) -> Result<ItemOutcome> {
        let mut repo = self.repo.lock();
        let Some(doc) = repo.get_document(&snapshot.id())? else {
            return Ok(ItemOutcome::Unchanged);
        };
        let disk = if doc.modified() == snapshot.modified() {
            disk
        } else {
            debug!(id = %doc.id(), "document edited during the pass");
            disk.reread(self.files, &doc)
        };
        let mut locked = Locked {
            repo: &mut *repo,
            index: &mut *self.index,
            files: self.files,
        };
        if doc.is_trashed() {
            locked.sync_trashed(doc, plan, existing, report)
        } else {
            locked.sync_live(doc, plan, disk, existing, report)
        }
    }

    fn finish<P>(&self, report: &SyncReport, progress: &mut P)
    where
        P: ProgressReporter + ?Sized,
    {
        let changed =
            report.stats.files_indexed + report.stats.files_updated + report.stats.files_removed;
        progress.on_complete(changed, report.errors.len());
        info!(
            mode = ?report.mode,
            indexed = report.stats.files_indexed,
            updated = report.stats.files_updated,
            removed = report.stats.files_removed,
            orphans = report.orphans.len(),
            errors = report.errors.len(),
            cancelled = report.cancelled,
            "sync finished"
        );
    }
}

/// The stores for one document, with the repository locked.
struct Locked<'s> {
    repo: &'s mut dyn DocumentRepository,
    index: &'s mut dyn IndexStore,
    files: &'s FileStore,
}

impl Locked<'_> {
    fn sync_live(
        &mut self,
        mut doc: Document,
        plan: &LibraryPlan,
        disk: OnDisk,
        existing: Option<&IndexRecord>,
        report: &mut SyncReport,
    ) -> Result<ItemOutcome> {
        let id = doc.id();
        let Some(target) = plan.planner.path_for(&id) else {
            return Ok(ItemOutcome::Unchanged);
        };
        let base = existing.and_then(IndexRecord::content_hash);

        let reconciled = match reconcile_files(self.files, &mut doc, target, disk, base) {
            Ok(r) => r,
            Err(err) => {
                warn!(id = %id, error = %err.message, "skipping document");
                let outcome = ItemOutcome::Failed(err.message.clone());
                report.errors.push(err);
                return Ok(outcome);
            }
        };

        if reconciled.doc_changed {
            self.repo.save_document(&doc)?;
        }
        if reconciled.drift {
            warn!(id = %id, "content drift between repository and file");
            report.drift.push(id);
        }
        if reconciled.missing {
            warn!(id = %id, "file-backed document has no file");
            report.errors.push(ItemError::new(
                id,
                ErrorKind::NotFound,
                "file-backed document has no file",
            ));
        }

        let record = index_record_for(&doc, &plan.planner, reconciled.body_hash, reconciled.missing);
        let record_written = self.upsert_if_changed(record, existing, report)?;
        Ok(if record_written || reconciled.files_changed {
            if existing.is_some() && !record_written {
                report.stats.files_updated += 1;
            }
            ItemOutcome::Changed
        } else {
            ItemOutcome::Unchanged
        })
    }

    fn sync_trashed(
        &mut self,
        doc: Document,
        plan: &LibraryPlan,
        existing: Option<&IndexRecord>,
        report: &mut SyncReport,
    ) -> Result<ItemOutcome> {
        let missing = doc.file_path().is_some_and(|p| !self.files.exists(p));
        let hash = body_hash(&doc).or_else(|| existing.and_then(|r| r.content_hash().cloned()));
        let record = index_record_for(&doc, &plan.planner, hash, missing);
        let changed = self.upsert_if_changed(record, existing, report)?;
        Ok(if changed {
            ItemOutcome::Changed
        } else {
            ItemOutcome::Unchanged
        })
    }

    /// Writes the record when it differs from what is indexed and counts it.
    fn upsert_if_changed(
        &mut self,
        record: IndexRecord,
        existing: Option<&IndexRecord>,
        report: &mut SyncReport,
    ) -> Result<bool> {
        match existing {
            Some(current) if *current == record => Ok(false),
            Some(_) => {
                self.index.upsert(&record)?;
                report.stats.files_updated += 1;
                Ok(true)
            }
            None => {
                self.index.upsert(&record)?;
                report.stats.files_indexed += 1;
                Ok(true)
            }
        }
    }
}

fn collided(doc: &Document, paths: &[PathBuf], report: &mut SyncReport) -> ItemOutcome {
    warn!(id = %doc.id(), "identifier claimed by several files");
    let err = collision(doc, paths);
    report.duplicates.push(doc.id());
    let outcome = ItemOutcome::Failed(err.message.clone());
    report.errors.push(err);
    outcome
}

/// Live files carrying a trashed document's identifier stay where they are
/// and are reported alongside the trash copy.
fn claimed_while_trashed(
    doc: &Document,
    claims: Vec<(PathBuf, ParsedFile)>,
    report: &mut SyncReport,
) {
    let live: Vec<PathBuf> = claims.into_iter().map(|(p, _)| p).collect();
    warn!(id = %doc.id(), files = live.len(), "live file claims a trashed document");
    let mut paths = live.clone();
    paths.extend(doc.file_path().map(Path::to_path_buf));
    report.duplicates.push(doc.id());
    report.errors.push(collision(doc, &paths));
    report.orphans.extend(live);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SqliteIndex;
    use crate::infra::DocumentHeader;
    use crate::repository::SqliteRepository;
    use pretty_assertions::assert_eq;
    use std::path::Path;
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

        fn engine(&mut self) -> SyncEngine<'_> {
            SyncEngine::new(&mut self.repo, &mut self.index, &self.files)
        }

        fn add(&mut self, title: &str, content: &str) -> Document {
            let mut doc = Document::new(DocumentId::new(), title, None, Utc::now());
            doc.set_content(content, Utc::now());
            self.repo.insert_document(&doc).unwrap();
            doc
        }
    }

    #[test]
    fn full_sync_materialises_new_document() {
        let mut s = Stores::new();
        let doc = s.add("Notes", "hello");

        let report = s.engine().full_sync().unwrap();
        assert_eq!(report.stats.files_indexed, 1);
        assert!(report.is_clean());
        assert_eq!(s.files.list_all_document_files().unwrap(), vec![PathBuf::from("Notes.md")]);

        let stored = s.repo.get_document(&doc.id()).unwrap().unwrap();
        assert_eq!(stored.file_path(), Some(Path::new("Notes.md")));
        assert!(s.index.last_sync().unwrap().is_some());
    }

    #[test]
    fn second_full_sync_is_noop() {
        let mut s = Stores::new();
        s.add("Notes", "hello");
        s.add("Ideas", "world");
        s.engine().full_sync().unwrap();

        let second = s.engine().full_sync().unwrap();
        assert!(second.stats.is_noop(), "{:?}", second.stats);
    }

    #[test]
    fn orphan_file_is_reported_not_deleted() {
        let mut s = Stores::new();
        let header = DocumentHeader {
            id: DocumentId::new(),
            title: "Stray".into(),
            created: Utc::now(),
            modified: Utc::now(),
            tags: vec![],
            status: None,
        };
        s.files
            .write_document(Path::new("Stray.md"), &header, "keep me")
            .unwrap();
        s.files.write(Path::new("plain.md"), "no header").unwrap();

        let report = s.engine().full_sync().unwrap();
        assert_eq!(
            report.orphans,
            vec![PathBuf::from("Stray.md"), PathBuf::from("plain.md")]
        );
        assert!(s.files.exists(Path::new("Stray.md")));
        assert!(s.files.exists(Path::new("plain.md")));
    }

    #[test]
    fn orphaned_index_record_is_removed() {
        let mut s = Stores::new();
        let ghost = IndexRecord::builder(DocumentId::new(), "Ghost", Utc::now(), Utc::now()).build();
        s.index.upsert(&ghost).unwrap();

        let report = s.engine().full_sync().unwrap();
        assert_eq!(report.stats.files_removed, 1);
        assert!(s.index.get(&ghost.id()).unwrap().is_none());
    }

    #[test]
    fn quick_sync_without_history_runs_full() {
        let mut s = Stores::new();
        s.add("Notes", "x");
        let report = s.engine().quick_sync().unwrap();
        assert_eq!(report.mode, SyncMode::Full);
        assert_eq!(report.stats.files_indexed, 1);
    }

    #[test]
    fn quick_sync_picks_up_edits_since_last_pass() {
        let mut s = Stores::new();
        let mut doc = s.add("Notes", "v1");
        s.add("Other", "untouched");
        s.engine().full_sync().unwrap();

        doc = s.repo.get_document(&doc.id()).unwrap().unwrap();
        doc.set_content("v2", Utc::now());
        s.repo.save_document(&doc).unwrap();

        let report = s.engine().quick_sync().unwrap();
        assert_eq!(report.mode, SyncMode::Quick);
        assert_eq!(report.stats.files_updated, 1);
        assert_eq!(
            s.files.read_document(Path::new("Notes.md")).unwrap().body,
            "v2"
        );
    }

    #[test]
    fn cancelled_pass_does_not_advance_last_sync() {
        let mut s = Stores::new();
        s.add("Notes", "x");
        let token = CancellationToken::new();
        token.cancel();

        let report = s.engine().with_cancellation(token).full_sync().unwrap();
        assert!(report.cancelled);
        assert!(s.index.last_sync().unwrap().is_none());
        assert!(s.files.list_all_document_files().unwrap().is_empty());
    }

    #[test]
    fn duplicate_files_are_reported_and_skipped() {
        let mut s = Stores::new();
        let doc = s.add("Notes", "x");
        let header = DocumentHeader::for_document(&doc);
        s.files.write_document(Path::new("A.md"), &header, "x").unwrap();
        s.files.write_document(Path::new("B.md"), &header, "x").unwrap();

        let report = s.engine().full_sync().unwrap();
        assert_eq!(report.duplicates, vec![doc.id()]);
        assert!(s.files.exists(Path::new("A.md")));
        assert!(s.files.exists(Path::new("B.md")));
        assert!(!s.files.exists(Path::new("Notes.md")));
    }

    #[test]
    fn unreadable_file_is_an_item_error() {
        let mut s = Stores::new();
        s.add("Fine", "ok");
        let abs = s.files.absolute(Path::new("broken.md")).unwrap();
        std::fs::write(abs, [0xFF, 0xFE, 0x41, 0x00]).unwrap();

        let report = s.engine().full_sync().unwrap();
        assert_eq!(report.stats.files_indexed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::EncodingFailure);
    }

    #[test]
    fn quick_sync_finds_file_moved_elsewhere() {
        let mut s = Stores::new();
        let doc = s.add("Notes", "v1");
        s.engine().full_sync().unwrap();

        let from = s.files.absolute(Path::new("Notes.md")).unwrap();
        let to = s.files.absolute(Path::new("Elsewhere/Notes.md")).unwrap();
        std::fs::create_dir_all(to.parent().unwrap()).unwrap();
        std::fs::rename(from, to).unwrap();
        let mut doc = s.repo.get_document(&doc.id()).unwrap().unwrap();
        doc.set_content("v2", Utc::now());
        s.repo.save_document(&doc).unwrap();

        let report = s.engine().quick_sync().unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(s.files.list_all_document_files().unwrap(), vec![PathBuf::from("Notes.md")]);
        assert_eq!(
            s.files.read_document(Path::new("Notes.md")).unwrap().body,
            "v2"
        );
    }

    #[test]
    fn live_file_claiming_trashed_document_is_reported() {
        let mut s = Stores::new();
        let doc = s.add("Notes", "x");
        s.engine().full_sync().unwrap();

        let trash_path = s.files.move_to_trash(Path::new("Notes.md")).unwrap();
        let mut doc = s.repo.get_document(&doc.id()).unwrap().unwrap();
        doc.mark_trashed(Utc::now(), Some(trash_path.clone()));
        s.repo.save_document(&doc).unwrap();
        let header = DocumentHeader::for_document(&doc);
        s.files.write_document(Path::new("Copy.md"), &header, "x").unwrap();

        let report = s.engine().full_sync().unwrap();
        assert_eq!(report.duplicates, vec![doc.id()]);
        assert_eq!(report.orphans, vec![PathBuf::from("Copy.md")]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::IdentifierCollision);
        assert!(s.files.exists(Path::new("Copy.md")));
        assert!(s.files.exists(&trash_path));
    }

    /// Edits every document the first time progress is reported.
    struct EditingReporter<'r> {
        repo: &'r Mutex<SqliteRepository>,
        ids: Vec<DocumentId>,
        edited: bool,
    }

    impl ProgressReporter for EditingReporter<'_> {
        fn on_item(&mut self, _item: &str, _outcome: &ItemOutcome) {
            if std::mem::replace(&mut self.edited, true) {
                return;
            }
            // Deadlocks if the pass still holds the repository.
            let mut repo = self.repo.lock().unwrap();
            for id in &self.ids {
                let mut doc = repo.get_document(id).unwrap().unwrap();
                doc.set_content("edited", Utc::now());
                repo.save_document(&doc).unwrap();
            }
        }

        fn on_complete(&mut self, _changed: usize, _errors: usize) {}
    }

    #[test]
    fn shared_pass_keeps_edits_made_mid_pass() {
        let dir = TempDir::new().unwrap();
        let files = FileStore::open(dir.path()).unwrap();
        let repo = Mutex::new(SqliteRepository::open_in_memory().unwrap());
        let mut index = SqliteIndex::open_in_memory().unwrap();
        let ids: Vec<DocumentId> = ["One", "Two", "Three"]
            .iter()
            .map(|title| {
                let mut doc = Document::new(DocumentId::new(), title, None, Utc::now());
                doc.set_content("draft", Utc::now());
                repo.lock().unwrap().insert_document(&doc).unwrap();
                doc.id()
            })
            .collect();

        let mut reporter = EditingReporter {
            repo: &repo,
            ids: ids.clone(),
            edited: false,
        };
        SyncEngine::shared(&repo, &mut index, &files)
            .full_sync_with_progress(&mut reporter)
            .unwrap();

        let repo = repo.into_inner().unwrap();
        for id in &ids {
            let doc = repo.get_document(id).unwrap().unwrap();
            assert_eq!(doc.content(), "edited", "{}", doc.title());
        }
    }
}
