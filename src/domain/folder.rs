//! Folder entity.

use crate::domain::FolderId;
use chrono::{DateTime, Utc};
use std::fmt;

/// Error returned when a folder name is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFolderError(String);

impl fmt::Display for ParseFolderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseFolderError {}

/// A folder in the library hierarchy.
///
/// Only the parent reference is stored. The on-disk directory of a folder is
/// derived from the chain of ancestor names every time it is needed, so a
/// rename never leaves a stale path behind in the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    id: FolderId,
    name: String,
    parent: Option<FolderId>,
    sort_order: i64,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl Folder {
    /// Creates a folder with a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns `ParseFolderError` if the trimmed name is empty.
    pub fn new(
        name: &str,
        parent: Option<FolderId>,
        now: DateTime<Utc>,
    ) -> Result<Self, ParseFolderError> {
        Ok(Self {
            id: FolderId::new(),
            name: validate_name(name)?,
            parent,
            sort_order: 0,
            created: now,
            modified: now,
        })
    }

    /// Rebuilds a folder from stored fields.
    pub fn from_parts(
        id: FolderId,
        name: String,
        parent: Option<FolderId>,
        sort_order: i64,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            parent,
            sort_order,
            created,
            modified,
        }
    }

    pub fn id(&self) -> FolderId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent folder, or `None` for a root-level folder.
    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    /// Ordering key among siblings.
    pub fn sort_order(&self) -> i64 {
        self.sort_order
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Renames the folder.
    ///
    /// # Errors
    ///
    /// Returns `ParseFolderError` if the trimmed name is empty.
    pub fn rename(&mut self, name: &str, now: DateTime<Utc>) -> Result<(), ParseFolderError> {
        self.name = validate_name(name)?;
        self.modified = now;
        Ok(())
    }

    /// Moves the folder under a new parent (`None` = root).
    ///
    /// Cycle detection is the repository's job since it needs the whole graph.
    pub fn set_parent(&mut self, parent: Option<FolderId>, now: DateTime<Utc>) {
        self.parent = parent;
        self.modified = now;
    }

    pub fn set_sort_order(&mut self, sort_order: i64) {
        self.sort_order = sort_order;
    }
}

fn validate_name(name: &str) -> Result<String, ParseFolderError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ParseFolderError(
            "invalid folder: name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn new_trims_name() {
        let folder = Folder::new("  Drafts ", None, now()).unwrap();
        assert_eq!(folder.name(), "Drafts");
        assert!(folder.parent().is_none());
    }

    #[test]
    fn new_rejects_blank_name() {
        assert!(Folder::new("   ", None, now()).is_err());
    }

    #[test]
    fn rename_bumps_modified() {
        let mut folder = Folder::new("Drafts", None, now()).unwrap();
        let later = now() + chrono::Duration::minutes(5);
        folder.rename("Drafts2025", later).unwrap();
        assert_eq!(folder.name(), "Drafts2025");
        assert_eq!(folder.modified(), later);
        assert_eq!(folder.created(), now());
    }

    #[test]
    fn rename_to_blank_keeps_old_name() {
        let mut folder = Folder::new("Drafts", None, now()).unwrap();
        assert!(folder.rename("", now()).is_err());
        assert_eq!(folder.name(), "Drafts");
    }
}
