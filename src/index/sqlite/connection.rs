//! Connection management for SqliteIndex.

use super::SqliteIndex;
use crate::db;
use crate::index::{IndexResult, create_schema};
use std::path::Path;

impl SqliteIndex {
    pub fn open_in_memory() -> IndexResult<Self> {
        let conn = db::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens or creates the index file at `path`.
    pub fn open(path: &Path) -> IndexResult<Self> {
        let conn = db::open_connection(path)?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }
}
