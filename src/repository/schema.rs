//! SQLite schema for the structured repository (`library.db`).

use rusqlite::Connection;

const SCHEMA_VERSION: i64 = 1;

/// Creates every table and index. Idempotent.
///
/// # Tables Created
/// - `folders` - folder hierarchy; the directory path is never stored
/// - `documents` - document metadata and repository-held content
/// - `tags`, `document_tags` - flat tags
/// - `goals`, `annotations` - per-document attachments
/// - `schema_version`
///
/// Folder references carry no foreign key so that a broken reference can be
/// detected and repaired instead of being silently nulled.
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS folders (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            parent_id TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created TEXT NOT NULL,
            modified TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            word_count INTEGER NOT NULL DEFAULT 0,
            char_count INTEGER NOT NULL DEFAULT 0,
            folder_id TEXT,
            created TEXT NOT NULL,
            modified TEXT NOT NULL,
            trashed_at TEXT,
            file_path TEXT,
            storage_mode TEXT NOT NULL DEFAULT 'repository',
            status TEXT NOT NULL DEFAULT 'draft',
            progress REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS document_tags (
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (document_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS goals (
            id INTEGER PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            target_words INTEGER NOT NULL,
            deadline TEXT,
            created TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS annotations (
            id INTEGER PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            range_start INTEGER NOT NULL,
            range_end INTEGER NOT NULL,
            text TEXT NOT NULL,
            created TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_folder ON documents(folder_id);
        CREATE INDEX IF NOT EXISTS idx_documents_modified ON documents(modified);
        CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent_id);

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
