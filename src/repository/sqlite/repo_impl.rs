//! DocumentRepository implementation for SqliteRepository.

use super::SqliteRepository;
use super::rows::{
    DOCUMENT_COLUMNS, DocumentRow, FOLDER_COLUMNS, FolderRow, annotation_from_row, goal_from_row,
    into_annotation, into_goal,
};
use crate::db::{self, Transaction, format_ts};
use crate::domain::{Annotation, Document, DocumentId, Folder, FolderId, Goal, Tag};
use crate::repository::{DocumentRepository, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

impl DocumentRepository for SqliteRepository {
    fn insert_document(&mut self, doc: &Document) -> RepositoryResult<()> {
        if document_exists(&self.conn, &doc.id())? {
            return Err(RepositoryError::DuplicateDocument { id: doc.id() });
        }
        let tx = self.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                DOCUMENT_COLUMNS
            ),
            params![
                doc.id().to_string(),
                doc.title(),
                doc.content(),
                doc.word_count(),
                doc.char_count(),
                doc.folder().map(|f| f.to_string()),
                format_ts(doc.created()),
                format_ts(doc.modified()),
                doc.trashed_at().map(format_ts),
                doc.file_path().map(|p| p.to_string_lossy().into_owned()),
                doc.storage_mode().as_str(),
                doc.status(),
                doc.progress(),
            ],
        )?;
        write_tags(&tx, &doc.id(), doc.tags())?;
        tx.commit()?;
        Ok(())
    }

    fn save_document(&mut self, doc: &Document) -> RepositoryResult<()> {
        let tx = self.transaction()?;
        update_document(&tx, doc)?;
        tx.commit()?;
        Ok(())
    }

    fn save_documents(&mut self, docs: &[Document]) -> RepositoryResult<()> {
        let tx = self.transaction()?;
        for doc in docs {
            update_document(&tx, doc)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_document(&self, id: &DocumentId) -> RepositoryResult<Option<Document>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS),
                [id.to_string()],
                DocumentRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let tags = tags_for(&self.conn, id)?;
                Ok(Some(row.into_document(tags)?))
            }
            None => Ok(None),
        }
    }

    fn list_documents(&self, include_trashed: bool) -> RepositoryResult<Vec<Document>> {
        let filter = if include_trashed {
            ""
        } else {
            "WHERE trashed_at IS NULL"
        };
        query_documents(
            &self.conn,
            &format!(
                "SELECT {} FROM documents {} ORDER BY id",
                DOCUMENT_COLUMNS, filter
            ),
            [],
        )
    }

    fn documents_modified_since(&self, since: DateTime<Utc>) -> RepositoryResult<Vec<Document>> {
        query_documents(
            &self.conn,
            &format!(
                "SELECT {} FROM documents WHERE modified > ?1 OR trashed_at > ?1 ORDER BY id",
                DOCUMENT_COLUMNS
            ),
            [format_ts(since)],
        )
    }

    fn find_by_prefix(&self, prefix: &str) -> RepositoryResult<Vec<Document>> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(Vec::new());
        }
        query_documents(
            &self.conn,
            &format!(
                "SELECT {} FROM documents WHERE id LIKE ?1 ORDER BY id",
                DOCUMENT_COLUMNS
            ),
            [format!("{}%", prefix.to_ascii_uppercase())],
        )
    }

    fn delete_document(&mut self, id: &DocumentId) -> RepositoryResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    fn insert_folder(&mut self, folder: &Folder) -> RepositoryResult<()> {
        if let Some(parent) = folder.parent() {
            require_folder(&self.conn, &parent)?;
        }
        self.conn.execute(
            &format!(
                "INSERT INTO folders ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                FOLDER_COLUMNS
            ),
            params![
                folder.id().to_string(),
                folder.name(),
                folder.parent().map(|p| p.to_string()),
                folder.sort_order(),
                format_ts(folder.created()),
                format_ts(folder.modified()),
            ],
        )?;
        Ok(())
    }

    fn save_folder(&mut self, folder: &Folder) -> RepositoryResult<()> {
        let tx = self.transaction()?;
        update_folder(&tx, folder)?;
        tx.commit()?;
        Ok(())
    }

    fn get_folder(&self, id: &FolderId) -> RepositoryResult<Option<Folder>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM folders WHERE id = ?", FOLDER_COLUMNS),
                [id.to_string()],
                FolderRow::from_row,
            )
            .optional()?
            .map(FolderRow::into_folder)
            .transpose()
    }

    fn list_folders(&self) -> RepositoryResult<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM folders ORDER BY sort_order, name, id",
            FOLDER_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], FolderRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(FolderRow::into_folder).collect()
    }

    fn delete_folder(&mut self, id: &FolderId) -> RepositoryResult<()> {
        require_folder(&self.conn, id)?;
        let id_str = id.to_string();
        let children: i64 = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM folders WHERE parent_id = ?1)
                  + (SELECT COUNT(*) FROM documents WHERE folder_id = ?1)",
            [&id_str],
            |row| row.get(0),
        )?;
        if children > 0 {
            return Err(RepositoryError::FolderNotEmpty { id: *id });
        }
        self.conn
            .execute("DELETE FROM folders WHERE id = ?", [&id_str])?;
        Ok(())
    }

    fn apply_folder_change(
        &mut self,
        folder: &Folder,
        moved: &[(DocumentId, PathBuf)],
    ) -> RepositoryResult<()> {
        let tx = self.transaction()?;
        update_folder(&tx, folder)?;
        for (id, path) in moved {
            let rows = tx.execute(
                "UPDATE documents SET file_path = ?1 WHERE id = ?2",
                params![path.to_string_lossy().into_owned(), id.to_string()],
            )?;
            if rows == 0 {
                return Err(RepositoryError::DocumentNotFound { id: *id });
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn add_goal(
        &mut self,
        document: &DocumentId,
        target_words: u32,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Goal> {
        if !document_exists(&self.conn, document)? {
            return Err(RepositoryError::DocumentNotFound { id: *document });
        }
        self.conn.execute(
            "INSERT INTO goals (document_id, target_words, deadline, created) VALUES (?1, ?2, ?3, ?4)",
            params![
                document.to_string(),
                target_words,
                deadline.map(format_ts),
                format_ts(now)
            ],
        )?;
        Ok(Goal {
            id: self.conn.last_insert_rowid(),
            document: *document,
            target_words,
            deadline,
            created: now,
        })
    }

    fn goals_for(&self, document: &DocumentId) -> RepositoryResult<Vec<Goal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document_id, target_words, deadline, created FROM goals
             WHERE document_id = ? ORDER BY id",
        )?;
        let rows = stmt
            .query_map([document.to_string()], goal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_goal).collect()
    }

    fn add_annotation(
        &mut self,
        document: &DocumentId,
        range: (u32, u32),
        text: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Annotation> {
        if !document_exists(&self.conn, document)? {
            return Err(RepositoryError::DocumentNotFound { id: *document });
        }
        let (start, end) = if range.0 <= range.1 {
            range
        } else {
            (range.1, range.0)
        };
        self.conn.execute(
            "INSERT INTO annotations (document_id, range_start, range_end, text, created)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![document.to_string(), start, end, text, format_ts(now)],
        )?;
        Ok(Annotation {
            id: self.conn.last_insert_rowid(),
            document: *document,
            range_start: start,
            range_end: end,
            text: text.to_string(),
            created: now,
        })
    }

    fn annotations_for(&self, document: &DocumentId) -> RepositoryResult<Vec<Annotation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document_id, range_start, range_end, text, created FROM annotations
             WHERE document_id = ? ORDER BY range_start, id",
        )?;
        let rows = stmt
            .query_map([document.to_string()], annotation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_annotation).collect()
    }

    fn backup_to(&self, target: &Path) -> RepositoryResult<()> {
        db::vacuum_into(&self.conn, target)?;
        Ok(())
    }
}

// ===== Helpers =====

fn update_document(tx: &Transaction<'_>, doc: &Document) -> RepositoryResult<()> {
    let rows = tx.execute(
        "UPDATE documents SET
             title = ?2, content = ?3, word_count = ?4, char_count = ?5, folder_id = ?6,
             created = ?7, modified = ?8, trashed_at = ?9, file_path = ?10,
             storage_mode = ?11, status = ?12, progress = ?13
         WHERE id = ?1",
        params![
            doc.id().to_string(),
            doc.title(),
            doc.content(),
            doc.word_count(),
            doc.char_count(),
            doc.folder().map(|f| f.to_string()),
            format_ts(doc.created()),
            format_ts(doc.modified()),
            doc.trashed_at().map(format_ts),
            doc.file_path().map(|p| p.to_string_lossy().into_owned()),
            doc.storage_mode().as_str(),
            doc.status(),
            doc.progress(),
        ],
    )?;
    if rows == 0 {
        return Err(RepositoryError::DocumentNotFound { id: doc.id() });
    }
    write_tags(tx, &doc.id(), doc.tags())
}

fn update_folder(tx: &Transaction<'_>, folder: &Folder) -> RepositoryResult<()> {
    require_folder(tx.conn(), &folder.id())?;
    if let Some(parent) = folder.parent() {
        require_folder(tx.conn(), &parent)?;
        if would_cycle(tx.conn(), &folder.id(), parent)? {
            return Err(RepositoryError::FolderCycle { id: folder.id() });
        }
    }
    tx.execute(
        "UPDATE folders SET name = ?2, parent_id = ?3, sort_order = ?4, modified = ?5
         WHERE id = ?1",
        params![
            folder.id().to_string(),
            folder.name(),
            folder.parent().map(|p| p.to_string()),
            folder.sort_order(),
            format_ts(folder.modified()),
        ],
    )?;
    Ok(())
}

/// True if making `new_parent` the parent of `folder` closes a loop.
fn would_cycle(
    conn: &Connection,
    folder: &FolderId,
    new_parent: FolderId,
) -> RepositoryResult<bool> {
    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == *folder {
            return Ok(true);
        }
        if !seen.insert(current) {
            // Already cyclic above us; moving under it would join the loop.
            return Ok(true);
        }
        let parent: Option<Option<String>> = conn
            .query_row(
                "SELECT parent_id FROM folders WHERE id = ?",
                [current.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        cursor = parent
            .flatten()
            .map(|p| p.parse::<FolderId>())
            .transpose()
            .map_err(|e| RepositoryError::InvalidData(format!("invalid parent folder id: {}", e)))?;
    }
    Ok(false)
}

fn write_tags(tx: &Transaction<'_>, id: &DocumentId, tags: &[Tag]) -> RepositoryResult<()> {
    let id_str = id.to_string();
    tx.execute("DELETE FROM document_tags WHERE document_id = ?", [&id_str])?;
    for tag in tags {
        tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?)", [tag.as_str()])?;
        tx.execute(
            "INSERT INTO document_tags (document_id, tag_id)
             SELECT ?, id FROM tags WHERE name = ?",
            [id_str.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}

fn tags_for(conn: &Connection, id: &DocumentId) -> RepositoryResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM tags t JOIN document_tags dt ON t.id = dt.tag_id
         WHERE dt.document_id = ? ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map([id.to_string()], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .filter_map(|name| Tag::new(&name).ok())
        .collect();
    Ok(tags)
}

fn all_tags(conn: &Connection) -> RepositoryResult<HashMap<String, Vec<Tag>>> {
    let mut stmt = conn.prepare(
        "SELECT dt.document_id, t.name FROM document_tags dt JOIN tags t ON t.id = dt.tag_id
         ORDER BY t.name",
    )?;
    let mut map: HashMap<String, Vec<Tag>> = HashMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for (doc, name) in rows.filter_map(|r| r.ok()) {
        if let Ok(tag) = Tag::new(&name) {
            map.entry(doc).or_default().push(tag);
        }
    }
    Ok(map)
}

fn query_documents(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> RepositoryResult<Vec<Document>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, DocumentRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    let mut tags = all_tags(conn)?;
    rows.into_iter()
        .map(|row| {
            let doc_tags = tags.remove(row.id()).unwrap_or_default();
            row.into_document(doc_tags)
        })
        .collect()
}

fn document_exists(conn: &Connection, id: &DocumentId) -> RepositoryResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM documents WHERE id = ?",
            [id.to_string()],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn require_folder(conn: &Connection, id: &FolderId) -> RepositoryResult<()> {
    let found = conn
        .query_row(
            "SELECT 1 FROM folders WHERE id = ?",
            [id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    match found {
        Some(()) => Ok(()),
        None => Err(RepositoryError::FolderNotFound { id: *id }),
    }
}
