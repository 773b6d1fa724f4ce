//! Folder rename and move cascades.
//!
//! A folder change relocates every file below it. The whole plan is computed
//! before anything moves; if any move or the final repository save fails,
//! the moves already made are undone and every stored path is left as it was.

use super::reconcile::same_path;
use crate::domain::{DocumentId, Folder};
use crate::error::{Error, Result};
use crate::infra::{FileStore, PathPlanner};
use crate::repository::DocumentRepository;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// One file relocation in a rename plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub id: DocumentId,
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Every path change caused by one folder change.
#[derive(Debug)]
pub struct RenamePlan {
    folder: Folder,
    moves: Vec<PlannedMove>,
    /// Documents whose file is already gone; only their stored path changes.
    relinks: Vec<(DocumentId, PathBuf)>,
    new_dir: PathBuf,
}

impl RenamePlan {
    /// Plans the cascade for `changed`, the folder as it will be after the
    /// rename or move.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder, `Path` for a change that
    /// would create a cycle and `CascadeAborted` when a target path is
    /// already taken by a file outside the plan.
    pub fn compute(
        repo: &dyn DocumentRepository,
        files: &FileStore,
        changed: &Folder,
    ) -> Result<Self> {
        let mut folders = repo.list_folders()?;
        let slot = folders
            .iter_mut()
            .find(|f| f.id() == changed.id())
            .ok_or_else(|| Error::FolderNotFound(changed.id().to_string()))?;
        *slot = changed.clone();

        let documents = repo.list_documents(false)?;
        let after = PathPlanner::new(&folders, &documents)?;

        let mut moves = Vec::new();
        let mut relinks = Vec::new();
        for doc in &documents {
            let (Some(current), Some(target)) = (doc.file_path(), after.path_for(&doc.id())) else {
                continue;
            };
            if current == target {
                continue;
            }
            if files.exists(current) {
                moves.push(PlannedMove {
                    id: doc.id(),
                    from: current.to_path_buf(),
                    to: target.to_path_buf(),
                });
            } else {
                relinks.push((doc.id(), target.to_path_buf()));
            }
        }

        for mv in &moves {
            let freed_by_plan = moves.iter().any(|other| same_path(&other.from, &mv.to));
            if files.exists(&mv.to) && !freed_by_plan {
                return Err(Error::CascadeAborted {
                    reason: format!("{} already exists", mv.to.display()),
                });
            }
        }

        let new_dir = after
            .folder_dir(&changed.id())
            .map(PathBuf::from)
            .unwrap_or_default();
        Ok(Self {
            folder: changed.clone(),
            moves,
            relinks,
            new_dir,
        })
    }

    pub fn moves(&self) -> &[PlannedMove] {
        &self.moves
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.relinks.is_empty()
    }

    /// Performs the moves and saves the folder with every new path.
    ///
    /// Returns the identifiers of all documents whose path changed.
    ///
    /// # Errors
    ///
    /// Returns `CascadeAborted` if a move fails, or the repository error if the
    /// final save fails. In both cases every completed move is reverted.
    pub fn execute(
        self,
        repo: &mut dyn DocumentRepository,
        files: &FileStore,
    ) -> Result<Vec<DocumentId>> {
        let mut done: Vec<&PlannedMove> = Vec::with_capacity(self.moves.len());
        for mv in &self.moves {
            if let Err(err) = files.move_file(&mv.from, &mv.to) {
                warn!(from = %mv.from.display(), to = %mv.to.display(), error = %err, "move failed; rolling back");
                rollback(files, &done);
                return Err(Error::CascadeAborted {
                    reason: err.to_string(),
                });
            }
            done.push(mv);
        }

        let updates: Vec<(DocumentId, PathBuf)> = self
            .moves
            .iter()
            .map(|mv| (mv.id, mv.to.clone()))
            .chain(self.relinks.iter().cloned())
            .collect();
        if let Err(err) = repo.apply_folder_change(&self.folder, &updates) {
            warn!(folder = %self.folder.id(), error = %err, "saving folder change failed; rolling back");
            rollback(files, &done);
            return Err(err.into());
        }

        for mv in &self.moves {
            files.remove_empty_dirs(&mv.from);
        }
        if !self.new_dir.as_os_str().is_empty()
            && let Err(err) = files.create_folder(&self.new_dir)
        {
            warn!(path = %self.new_dir.display(), error = %err, "could not create folder directory");
        }

        info!(
            folder = %self.folder.name(),
            moved = self.moves.len(),
            relinked = self.relinks.len(),
            "folder change applied"
        );
        Ok(updates.into_iter().map(|(id, _)| id).collect())
    }
}

fn rollback(files: &FileStore, done: &[&PlannedMove]) {
    for mv in done.iter().rev() {
        match files.move_file(&mv.to, &mv.from) {
            Ok(()) => {
                files.remove_empty_dirs(&mv.to);
                debug!(path = %mv.from.display(), "restored file");
            }
            Err(err) => {
                warn!(from = %mv.to.display(), to = %mv.from.display(), error = %err, "rollback move failed");
            }
        }
    }
}
