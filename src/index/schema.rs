//! SQLite schema for the index store (`index.db`).

use rusqlite::Connection;

const SCHEMA_VERSION: i64 = 1;

/// Creates the index tables. Idempotent.
///
/// # Tables Created
/// - `records` - one denormalised row per document; tags as a JSON array
/// - `sync_state` - key/value pairs such as `last_sync`
/// - `schema_version`
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            created TEXT NOT NULL,
            modified TEXT NOT NULL,
            progress REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT '',
            path TEXT,
            folder TEXT NOT NULL DEFAULT '',
            word_count INTEGER NOT NULL DEFAULT 0,
            char_count INTEGER NOT NULL DEFAULT 0,
            content_hash TEXT,
            trashed INTEGER NOT NULL DEFAULT 0,
            missing INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_records_folder ON records(folder);
        CREATE INDEX IF NOT EXISTS idx_records_title ON records(title COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get(0)
    })
}
