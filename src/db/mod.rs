//! SQLite plumbing shared by the structured repository and the index store.

mod transaction;

pub use transaction::Transaction;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Opens (or creates) a database file, creating parent directories first.
pub(crate) fn open_connection(path: &Path) -> Result<Connection, OpenError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|source| OpenError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        warn!(path = %path.display(), mode = %mode, "write-ahead logging unavailable");
    }
    Ok(conn)
}

pub(crate) fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Failure to open a database file.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("cannot create database directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open database: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Fixed-width RFC 3339 so that text comparison in SQL is chronological.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
}

/// Copies a live database into a standalone file.
pub(crate) fn vacuum_into(conn: &Connection, target: &Path) -> rusqlite::Result<()> {
    conn.execute("VACUUM INTO ?1", [target.to_string_lossy().as_ref()])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_as_text() {
        let early = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(5);
        assert!(format_ts(early) < format_ts(late));
        assert_eq!(format_ts(early), "2024-01-15T10:30:00.000000000Z");
    }

    #[test]
    fn timestamps_roundtrip_with_nanoseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(parse_ts(&format_ts(ts)).unwrap(), ts);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/library.db");
        open_connection(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn file_databases_use_write_ahead_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let conn = open_connection(&dir.path().join("library.db")).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }
}
