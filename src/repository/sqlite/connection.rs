//! Connection management for SqliteRepository.

use super::SqliteRepository;
use crate::db::{self, Transaction};
use crate::repository::{RepositoryResult, create_schema};
use std::path::Path;

impl SqliteRepository {
    /// Opens an in-memory repository, for tests and throwaway libraries.
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = db::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens or creates the repository file at `path`.
    pub fn open(path: &Path) -> RepositoryResult<Self> {
        let conn = db::open_connection(path)?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn transaction(&mut self) -> RepositoryResult<Transaction<'_>> {
        Ok(Transaction::begin(&self.conn)?)
    }
}
