//! Reconciliation between the repository, the file tree and the index.
//!
//! The repository is authoritative for identity and relationships; files are
//! a projection of it and the index is a disposable cache of both.

mod accessor;
mod cascade;
mod debounce;
mod engine;
mod reconcile;

pub use accessor::{ContentAccessor, ContentRead, ContentSource};
pub use cascade::{PlannedMove, RenamePlan};
pub use debounce::Debouncer;
pub use engine::{SyncEngine, SyncMode, SyncReport};

pub(crate) use reconcile::{OnDisk, TreeScan, materialize};

use crate::domain::{Document, Folder};
use crate::error::Result;
use crate::infra::PathPlanner;
use crate::repository::DocumentRepository;

/// Folders, live documents and their resolved paths, read in one go.
pub(crate) struct LibraryPlan {
    pub folders: Vec<Folder>,
    pub documents: Vec<Document>,
    pub planner: PathPlanner,
}

impl LibraryPlan {
    pub(crate) fn load(repo: &dyn DocumentRepository) -> Result<Self> {
        let folders = repo.list_folders()?;
        let documents = repo.list_documents(true)?;
        let planner = PathPlanner::new(&folders, &documents)?;
        Ok(Self {
            folders,
            documents,
            planner,
        })
    }
}
