//! Safety snapshots taken before bulk destructive operations.

use crate::infra::fs::{FileStore, FileStoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// A snapshot directory written by [`create_backup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    pub path: PathBuf,
    pub files: usize,
}

#[derive(Serialize)]
struct Manifest<'a> {
    created: DateTime<Utc>,
    reason: &'a str,
    files: usize,
}

/// Copies every document file, including the trash, into
/// `<backups_dir>/<timestamp>/files/` and writes a `manifest.json` beside it.
///
/// # Errors
///
/// Returns the first I/O failure; a partially written snapshot is left in
/// place for inspection.
pub fn create_backup(
    store: &FileStore,
    backups_dir: &Path,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Backup, FileStoreError> {
    let target = unique_snapshot_dir(backups_dir, now);
    let files_dir = target.join("files");
    std::fs::create_dir_all(&files_dir).map_err(|e| io_error(&files_dir, e))?;

    let mut sources = store.list_all_document_files()?;
    sources.extend(store.list_trash_files()?);

    for relative in &sources {
        let from = store.absolute(relative)?;
        let to = files_dir.join(relative);
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        std::fs::copy(&from, &to).map_err(|e| io_error(relative, e))?;
    }

    let manifest = Manifest {
        created: now,
        reason,
        files: sources.len(),
    };
    let manifest_path = target.join("manifest.json");
    let json = serde_json::to_vec_pretty(&manifest).map_err(|e| io_error(&manifest_path, e.into()))?;
    std::fs::write(&manifest_path, json).map_err(|e| io_error(&manifest_path, e))?;

    info!(path = %target.display(), files = sources.len(), reason, "created safety backup");
    Ok(Backup {
        path: target,
        files: sources.len(),
    })
}

fn unique_snapshot_dir(backups_dir: &Path, now: DateTime<Utc>) -> PathBuf {
    let stamp = now.format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let first = backups_dir.join(&stamp);
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| backups_dir.join(format!("{}-{}", stamp, n)))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

fn io_error(path: &Path, source: std::io::Error) -> FileStoreError {
    FileStoreError::Io {
        path: path.into(),
        source,
    }
}
