//! SQLite-backed index store.

mod connection;
mod repo_impl;

#[cfg(test)]
mod tests;

use rusqlite::Connection;

/// Index store kept in its own SQLite file, separate from the repository.
pub struct SqliteIndex {
    pub(crate) conn: Connection,
}
