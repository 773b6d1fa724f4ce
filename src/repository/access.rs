//! How a pass reaches the repository.
//!
//! Long passes hold a shared handle and lock it per document, so edits made
//! through the library interleave with the pass instead of queueing behind it.

use super::DocumentRepository;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub enum RepositoryAccess<'a> {
    /// Borrowed for the whole pass.
    Exclusive(&'a mut dyn DocumentRepository),
    /// Locked for each unit of work.
    Shared(&'a Mutex<dyn DocumentRepository>),
}

impl<'a> RepositoryAccess<'a> {
    /// Locks the repository until the guard drops.
    ///
    /// A poisoned mutex is recovered: repository saves are transactional, so
    /// a panic mid-save leaves nothing half-applied.
    pub fn lock(&mut self) -> RepositoryGuard<'_, 'a> {
        match self {
            RepositoryAccess::Exclusive(repo) => RepositoryGuard::Exclusive(&mut **repo),
            RepositoryAccess::Shared(mutex) => {
                RepositoryGuard::Shared(mutex.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }

    /// A shorter-lived handle for handing to another engine.
    pub fn reborrow(&mut self) -> RepositoryAccess<'_> {
        match self {
            RepositoryAccess::Exclusive(repo) => RepositoryAccess::Exclusive(&mut **repo),
            RepositoryAccess::Shared(mutex) => RepositoryAccess::Shared(*mutex),
        }
    }
}

pub enum RepositoryGuard<'g, 'a> {
    Exclusive(&'g mut (dyn DocumentRepository + 'a)),
    Shared(MutexGuard<'g, dyn DocumentRepository + 'static>),
}

impl<'a> Deref for RepositoryGuard<'_, 'a> {
    type Target = dyn DocumentRepository + 'a;

    fn deref(&self) -> &Self::Target {
        match self {
            RepositoryGuard::Exclusive(repo) => &**repo,
            RepositoryGuard::Shared(guard) => &**guard,
        }
    }
}

impl DerefMut for RepositoryGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            RepositoryGuard::Exclusive(repo) => &mut **repo,
            RepositoryGuard::Shared(guard) => &mut **guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, DocumentId};
    use crate::repository::SqliteRepository;
    use chrono::Utc;

    #[test]
    fn shared_access_releases_between_locks() {
        let mutex = Mutex::new(SqliteRepository::open_in_memory().unwrap());
        let mut access = RepositoryAccess::Shared(&mutex);
        let doc = Document::new(DocumentId::new(), "Notes", None, Utc::now());

        access.lock().insert_document(&doc).unwrap();
        // The pass holds no lock between units of work.
        assert!(mutex.try_lock().is_ok());
        assert!(access.lock().get_document(&doc.id()).unwrap().is_some());
    }

    #[test]
    fn exclusive_access_reborrows() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let doc = Document::new(DocumentId::new(), "Notes", None, Utc::now());
        {
            let mut access = RepositoryAccess::Exclusive(&mut repo);
            let mut inner = access.reborrow();
            inner.lock().insert_document(&doc).unwrap();
        }
        assert!(repo.get_document(&doc.id()).unwrap().is_some());
    }
}
