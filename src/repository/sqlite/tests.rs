use super::SqliteRepository;
use crate::domain::{Document, DocumentId, Folder, StorageMode, Tag};
use crate::repository::{DocumentRepository, RepositoryError};
use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

// ===== Helpers =====

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn repo() -> SqliteRepository {
    SqliteRepository::open_in_memory().unwrap()
}

fn doc(title: &str) -> Document {
    Document::new(DocumentId::new(), title, None, t0())
}

// ===== Documents =====

#[test]
fn insert_and_get_roundtrips_all_fields() {
    let mut repo = repo();
    let folder = Folder::new("Drafts", None, t0()).unwrap();
    repo.insert_folder(&folder).unwrap();

    let mut d = Document::new(DocumentId::new(), "Notes", Some(folder.id()), t0());
    d.set_content("one two three", t0() + Duration::seconds(1));
    d.set_tags(vec![Tag::new("b").unwrap(), Tag::new("a").unwrap()], t0());
    d.set_status("revising", t0() + Duration::seconds(2));
    d.set_progress(0.5);
    d.set_file_path(Some(PathBuf::from("Drafts/Notes.md")));
    d.set_storage_mode(StorageMode::Hybrid);
    repo.insert_document(&d).unwrap();

    let loaded = repo.get_document(&d.id()).unwrap().unwrap();
    assert_eq!(loaded, d);
}

#[test]
fn insert_twice_is_duplicate() {
    let mut repo = repo();
    let d = doc("Notes");
    repo.insert_document(&d).unwrap();
    assert!(matches!(
        repo.insert_document(&d),
        Err(RepositoryError::DuplicateDocument { .. })
    ));
}

#[test]
fn save_missing_document_is_not_found() {
    let mut repo = repo();
    assert!(matches!(
        repo.save_document(&doc("Ghost")),
        Err(RepositoryError::DocumentNotFound { .. })
    ));
}

#[test]
fn save_replaces_tags() {
    let mut repo = repo();
    let mut d = doc("Notes");
    d.set_tags(vec![Tag::new("old").unwrap()], t0());
    repo.insert_document(&d).unwrap();
    d.set_tags(vec![Tag::new("new").unwrap()], t0());
    repo.save_document(&d).unwrap();

    let loaded = repo.get_document(&d.id()).unwrap().unwrap();
    assert_eq!(loaded.tags(), &[Tag::new("new").unwrap()]);
}

#[test]
fn list_excludes_trashed_unless_asked() {
    let mut repo = repo();
    let live = doc("Live");
    let mut gone = doc("Gone");
    gone.mark_trashed(t0(), None);
    repo.insert_document(&live).unwrap();
    repo.insert_document(&gone).unwrap();

    assert_eq!(repo.list_documents(false).unwrap().len(), 1);
    assert_eq!(repo.list_documents(true).unwrap().len(), 2);
}

#[test]
fn modified_since_is_strict() {
    let mut repo = repo();
    let old = doc("Old");
    let mut new = doc("New");
    new.set_content("x", t0() + Duration::minutes(5));
    repo.insert_document(&old).unwrap();
    repo.insert_document(&new).unwrap();

    let changed = repo.documents_modified_since(t0()).unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].id(), new.id());
}

#[test]
fn modified_since_includes_recently_trashed() {
    let mut repo = repo();
    let mut d = doc("Notes");
    repo.insert_document(&d).unwrap();
    d.mark_trashed(t0() + Duration::minutes(1), None);
    repo.save_document(&d).unwrap();

    let changed = repo.documents_modified_since(t0()).unwrap();
    assert_eq!(changed.len(), 1);
}

#[test]
fn find_by_prefix_is_case_insensitive() {
    let mut repo = repo();
    let d = doc("Notes");
    repo.insert_document(&d).unwrap();
    let prefix = d.id().to_string()[..8].to_ascii_lowercase();
    assert_eq!(repo.find_by_prefix(&prefix).unwrap().len(), 1);
    assert!(repo.find_by_prefix("%").unwrap().is_empty());
    assert!(repo.find_by_prefix("").unwrap().is_empty());
}

#[test]
fn delete_cascades_to_goals_and_annotations() {
    let mut repo = repo();
    let mut d = doc("Notes");
    d.set_tags(vec![Tag::new("x").unwrap()], t0());
    repo.insert_document(&d).unwrap();
    repo.add_goal(&d.id(), 1000, None, t0()).unwrap();
    repo.add_annotation(&d.id(), (5, 1), "check", t0()).unwrap();

    assert!(repo.delete_document(&d.id()).unwrap());
    assert!(repo.get_document(&d.id()).unwrap().is_none());
    assert!(repo.goals_for(&d.id()).unwrap().is_empty());
    assert!(repo.annotations_for(&d.id()).unwrap().is_empty());
    assert!(!repo.delete_document(&d.id()).unwrap());
}

#[test]
fn annotation_range_is_normalised() {
    let mut repo = repo();
    let d = doc("Notes");
    repo.insert_document(&d).unwrap();
    let a = repo.add_annotation(&d.id(), (9, 3), "x", t0()).unwrap();
    assert_eq!((a.range_start, a.range_end), (3, 9));
    assert_eq!(repo.annotations_for(&d.id()).unwrap(), vec![a]);
}

#[test]
fn goal_for_missing_document_fails() {
    let mut repo = repo();
    assert!(matches!(
        repo.add_goal(&DocumentId::new(), 10, None, t0()),
        Err(RepositoryError::DocumentNotFound { .. })
    ));
}

// ===== Folders =====

#[test]
fn folder_roundtrip_and_listing() {
    let mut repo = repo();
    let parent = Folder::new("Book", None, t0()).unwrap();
    let child = Folder::new("Part One", Some(parent.id()), t0()).unwrap();
    repo.insert_folder(&parent).unwrap();
    repo.insert_folder(&child).unwrap();

    assert_eq!(repo.get_folder(&child.id()).unwrap(), Some(child.clone()));
    assert_eq!(repo.list_folders().unwrap().len(), 2);
}

#[test]
fn insert_folder_with_missing_parent_fails() {
    let mut repo = repo();
    let orphan = Folder::new("X", Some(crate::domain::FolderId::new()), t0()).unwrap();
    assert!(matches!(
        repo.insert_folder(&orphan),
        Err(RepositoryError::FolderNotFound { .. })
    ));
}

#[test]
fn save_folder_rejects_cycles() {
    let mut repo = repo();
    let mut a = Folder::new("A", None, t0()).unwrap();
    let b = Folder::new("B", Some(a.id()), t0()).unwrap();
    repo.insert_folder(&a).unwrap();
    repo.insert_folder(&b).unwrap();

    a.set_parent(Some(b.id()), t0());
    assert!(matches!(
        repo.save_folder(&a),
        Err(RepositoryError::FolderCycle { .. })
    ));

    a.set_parent(Some(a.id()), t0());
    assert!(matches!(
        repo.save_folder(&a),
        Err(RepositoryError::FolderCycle { .. })
    ));
}

#[test]
fn delete_folder_requires_empty() {
    let mut repo = repo();
    let f = Folder::new("Drafts", None, t0()).unwrap();
    repo.insert_folder(&f).unwrap();
    let d = Document::new(DocumentId::new(), "Notes", Some(f.id()), t0());
    repo.insert_document(&d).unwrap();

    assert!(matches!(
        repo.delete_folder(&f.id()),
        Err(RepositoryError::FolderNotEmpty { .. })
    ));
    repo.delete_document(&d.id()).unwrap();
    repo.delete_folder(&f.id()).unwrap();
    assert!(repo.get_folder(&f.id()).unwrap().is_none());
}

#[test]
fn apply_folder_change_is_atomic() {
    let mut repo = repo();
    let mut f = Folder::new("Drafts", None, t0()).unwrap();
    repo.insert_folder(&f).unwrap();
    let d = Document::new(DocumentId::new(), "Notes", Some(f.id()), t0());
    repo.insert_document(&d).unwrap();

    f.rename("Drafts2025", t0()).unwrap();
    let moved = vec![
        (d.id(), PathBuf::from("Drafts2025/Notes.md")),
        (DocumentId::new(), PathBuf::from("Drafts2025/Ghost.md")),
    ];
    assert!(repo.apply_folder_change(&f, &moved).is_err());

    // Nothing was applied
    assert_eq!(repo.get_folder(&f.id()).unwrap().unwrap().name(), "Drafts");
    assert!(repo.get_document(&d.id()).unwrap().unwrap().file_path().is_none());

    repo.apply_folder_change(&f, &moved[..1]).unwrap();
    assert_eq!(repo.get_folder(&f.id()).unwrap().unwrap().name(), "Drafts2025");
    assert_eq!(
        repo.get_document(&d.id()).unwrap().unwrap().file_path(),
        Some(Path::new("Drafts2025/Notes.md"))
    );
}

// ===== Persistence =====

#[test]
fn file_backed_repository_persists_and_backs_up() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("data/library.db");
    let d = doc("Notes");
    {
        let mut repo = SqliteRepository::open(&path).unwrap();
        repo.insert_document(&d).unwrap();
        repo.backup_to(&dir.path().join("copy.db")).unwrap();
    }
    let reopened = SqliteRepository::open(&path).unwrap();
    assert!(reopened.get_document(&d.id()).unwrap().is_some());
    let copy = SqliteRepository::open(&dir.path().join("copy.db")).unwrap();
    assert!(copy.get_document(&d.id()).unwrap().is_some());
}
