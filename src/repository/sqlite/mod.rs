//! SQLite-backed structured repository.

mod connection;
mod repo_impl;
mod rows;

#[cfg(test)]
mod tests;

use rusqlite::Connection;

/// Structured repository stored in its own SQLite file.
pub struct SqliteRepository {
    pub(crate) conn: Connection,
}
