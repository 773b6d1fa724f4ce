//! Row decoding for the repository tables.

use crate::db::parse_ts;
use crate::domain::{Annotation, Document, DocumentId, Folder, FolderId, Goal, StorageMode, Tag};
use crate::repository::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::Row;
use std::fmt::Display;
use std::path::PathBuf;

pub(super) const DOCUMENT_COLUMNS: &str = "id, title, content, word_count, char_count, folder_id, \
     created, modified, trashed_at, file_path, storage_mode, status, progress";

pub(super) const FOLDER_COLUMNS: &str = "id, name, parent_id, sort_order, created, modified";

pub(super) struct DocumentRow {
    id: String,
    title: String,
    content: String,
    word_count: i64,
    char_count: i64,
    folder_id: Option<String>,
    created: String,
    modified: String,
    trashed_at: Option<String>,
    file_path: Option<String>,
    storage_mode: String,
    status: String,
    progress: f64,
}

impl DocumentRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            word_count: row.get(3)?,
            char_count: row.get(4)?,
            folder_id: row.get(5)?,
            created: row.get(6)?,
            modified: row.get(7)?,
            trashed_at: row.get(8)?,
            file_path: row.get(9)?,
            storage_mode: row.get(10)?,
            status: row.get(11)?,
            progress: row.get(12)?,
        })
    }

    pub(super) fn id(&self) -> &str {
        &self.id
    }

    pub(super) fn into_document(self, tags: Vec<Tag>) -> RepositoryResult<Document> {
        let id: DocumentId = self.id.parse().map_err(|e| invalid("document id", e))?;
        let folder = self
            .folder_id
            .map(|f| f.parse::<FolderId>())
            .transpose()
            .map_err(|e| invalid("folder id", e))?;
        let storage_mode: StorageMode = self
            .storage_mode
            .parse()
            .map_err(|e| invalid("storage mode", e))?;

        Ok(Document::builder(id, &self.title, timestamp("created", &self.created)?)
            .content(self.content)
            .counts(count(self.word_count), count(self.char_count))
            .folder(folder)
            .modified(timestamp("modified", &self.modified)?)
            .trashed_at(
                self.trashed_at
                    .as_deref()
                    .map(|t| timestamp("trashed_at", t))
                    .transpose()?,
            )
            .file_path(self.file_path.map(PathBuf::from))
            .storage_mode(storage_mode)
            .status(self.status)
            .progress(self.progress)
            .tags(tags)
            .build())
    }
}

pub(super) struct FolderRow {
    id: String,
    name: String,
    parent_id: Option<String>,
    sort_order: i64,
    created: String,
    modified: String,
}

impl FolderRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            parent_id: row.get(2)?,
            sort_order: row.get(3)?,
            created: row.get(4)?,
            modified: row.get(5)?,
        })
    }

    pub(super) fn into_folder(self) -> RepositoryResult<Folder> {
        let id: FolderId = self.id.parse().map_err(|e| invalid("folder id", e))?;
        let parent = self
            .parent_id
            .map(|p| p.parse::<FolderId>())
            .transpose()
            .map_err(|e| invalid("parent folder id", e))?;
        Ok(Folder::from_parts(
            id,
            self.name,
            parent,
            self.sort_order,
            timestamp("created", &self.created)?,
            timestamp("modified", &self.modified)?,
        ))
    }
}

pub(super) fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, i64, Option<String>, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

pub(super) fn into_goal(
    (id, document, target, deadline, created): (i64, String, i64, Option<String>, String),
) -> RepositoryResult<Goal> {
    Ok(Goal {
        id,
        document: document.parse().map_err(|e| invalid("document id", e))?,
        target_words: count(target),
        deadline: deadline
            .as_deref()
            .map(|d| timestamp("deadline", d))
            .transpose()?,
        created: timestamp("created", &created)?,
    })
}

pub(super) type AnnotationRow = (i64, String, i64, i64, String, String);

pub(super) fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<AnnotationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

pub(super) fn into_annotation(
    (id, document, start, end, text, created): AnnotationRow,
) -> RepositoryResult<Annotation> {
    Ok(Annotation {
        id,
        document: document.parse().map_err(|e| invalid("document id", e))?,
        range_start: count(start),
        range_end: count(end),
        text,
        created: timestamp("created", &created)?,
    })
}

fn timestamp(field: &str, value: &str) -> RepositoryResult<DateTime<Utc>> {
    parse_ts(value).map_err(|e| invalid(field, e))
}

fn count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn invalid(what: &str, err: impl Display) -> RepositoryError {
    RepositoryError::InvalidData(format!("invalid {}: {}", what, err))
}
