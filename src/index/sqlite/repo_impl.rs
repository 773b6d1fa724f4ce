//! IndexStore implementation for SqliteIndex.

use super::SqliteIndex;
use crate::db::{format_ts, parse_ts};
use crate::domain::{DocumentId, Tag};
use crate::index::{IndexError, IndexRecord, IndexResult, IndexStore};
use crate::infra::ContentHash;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use std::fmt::Display;
use std::path::PathBuf;

const LAST_SYNC_KEY: &str = "last_sync";

const RECORD_COLUMNS: &str = "id, title, tags, created, modified, progress, status, path, \
     folder, word_count, char_count, content_hash, trashed, missing";

const ORDER: &str = "ORDER BY folder, title COLLATE NOCASE, id";

impl IndexStore for SqliteIndex {
    fn upsert(&mut self, record: &IndexRecord) -> IndexResult<()> {
        let tags = serde_json::to_string(record.tags()).expect("tags serialize to JSON");
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO records ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                RECORD_COLUMNS
            ),
            params![
                record.id().to_string(),
                record.title(),
                tags,
                format_ts(record.created()),
                format_ts(record.modified()),
                record.progress(),
                record.status(),
                record.path().map(|p| p.to_string_lossy().into_owned()),
                record.folder(),
                record.word_count(),
                record.char_count(),
                record.content_hash().map(|h| h.as_str().to_string()),
                record.is_trashed(),
                record.is_missing(),
            ],
        )?;
        Ok(())
    }

    fn remove(&mut self, id: &DocumentId) -> IndexResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1", [id.to_string()])?;
        Ok(rows > 0)
    }

    fn get(&self, id: &DocumentId) -> IndexResult<Option<IndexRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS),
                [id.to_string()],
                RecordRow::from_row,
            )
            .optional()?;
        row.map(RecordRow::into_record).transpose()
    }

    fn all_records(&self) -> IndexResult<Vec<IndexRecord>> {
        self.query("", &[])
    }

    fn list_all(&self) -> IndexResult<Vec<IndexRecord>> {
        self.query("WHERE trashed = 0", &[])
    }

    fn list_trashed(&self) -> IndexResult<Vec<IndexRecord>> {
        self.query("WHERE trashed = 1", &[])
    }

    fn list_in_folder(&self, folder: &str) -> IndexResult<Vec<IndexRecord>> {
        let folder = folder.trim_matches('/');
        self.query("WHERE trashed = 0 AND folder = ?1", &[&folder])
    }

    fn folders(&self) -> IndexResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT folder FROM records WHERE trashed = 0 AND folder != '' ORDER BY folder",
        )?;
        let folders = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(folders)
    }

    fn search(&self, query: &str) -> IndexResult<Vec<IndexRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        self.query(
            "WHERE trashed = 0 AND (lower(title) LIKE ?1 ESCAPE '\\' OR tags LIKE ?1 ESCAPE '\\')",
            &[&pattern],
        )
    }

    fn aggregate_word_count(&self) -> IndexResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(word_count), 0) FROM records WHERE trashed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    fn set_missing(&mut self, id: &DocumentId, missing: bool) -> IndexResult<()> {
        self.conn.execute(
            "UPDATE records SET missing = ?1 WHERE id = ?2",
            params![missing, id.to_string()],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> IndexResult<()> {
        self.conn.execute("DELETE FROM records", [])?;
        Ok(())
    }

    fn last_sync(&self) -> IndexResult<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?1",
                [LAST_SYNC_KEY],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|v| parse_ts(&v).map_err(|e| invalid("last sync time", e)))
            .transpose()
    }

    fn set_last_sync(&mut self, at: DateTime<Utc>) -> IndexResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?1, ?2)",
            params![LAST_SYNC_KEY, format_ts(at)],
        )?;
        Ok(())
    }
}

impl SqliteIndex {
    fn query(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> IndexResult<Vec<IndexRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM records {} {}",
            RECORD_COLUMNS, filter, ORDER
        ))?;
        let rows = stmt
            .query_map(args, RecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }
}

struct RecordRow {
    id: String,
    title: String,
    tags: String,
    created: String,
    modified: String,
    progress: f64,
    status: String,
    path: Option<String>,
    folder: String,
    word_count: i64,
    char_count: i64,
    content_hash: Option<String>,
    trashed: bool,
    missing: bool,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            tags: row.get(2)?,
            created: row.get(3)?,
            modified: row.get(4)?,
            progress: row.get(5)?,
            status: row.get(6)?,
            path: row.get(7)?,
            folder: row.get(8)?,
            word_count: row.get(9)?,
            char_count: row.get(10)?,
            content_hash: row.get(11)?,
            trashed: row.get(12)?,
            missing: row.get(13)?,
        })
    }

    fn into_record(self) -> IndexResult<IndexRecord> {
        let id: DocumentId = self.id.parse().map_err(|e| invalid("document id", e))?;
        let tags: Vec<Tag> = serde_json::from_str(&self.tags).map_err(|e| invalid("tags", e))?;
        let created = parse_ts(&self.created).map_err(|e| invalid("created", e))?;
        let modified = parse_ts(&self.modified).map_err(|e| invalid("modified", e))?;
        let hash = self
            .content_hash
            .as_deref()
            .map(ContentHash::from_hex)
            .transpose()
            .map_err(|e| invalid("content hash", e))?;

        Ok(IndexRecord::builder(id, self.title, created, modified)
            .tags(tags)
            .progress(self.progress)
            .status(self.status)
            .path(self.path.map(PathBuf::from))
            .folder(self.folder)
            .counts(count(self.word_count), count(self.char_count))
            .content_hash(hash)
            .trashed(self.trashed)
            .missing(self.missing)
            .build())
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn invalid(what: &str, err: impl Display) -> IndexError {
    IndexError::InvalidData(format!("invalid {}: {}", what, err))
}
