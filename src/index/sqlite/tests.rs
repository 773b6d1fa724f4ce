use super::SqliteIndex;
use crate::domain::{DocumentId, Tag};
use crate::index::{IndexRecord, IndexStore};
use crate::infra::ContentHash;
use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ===== Helpers =====

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn index() -> SqliteIndex {
    SqliteIndex::open_in_memory().unwrap()
}

fn record(title: &str, folder: &str, words: u32) -> IndexRecord {
    let path = if folder.is_empty() {
        PathBuf::from(format!("{}.md", title))
    } else {
        PathBuf::from(format!("{}/{}.md", folder, title))
    };
    IndexRecord::builder(DocumentId::new(), title, t0(), t0())
        .folder(folder)
        .path(Some(path))
        .counts(words, words * 5)
        .status("draft")
        .build()
}

// ===== Records =====

#[test]
fn upsert_and_get_roundtrips() {
    let mut index = index();
    let r = IndexRecord::builder(DocumentId::new(), "Notes", t0(), t0() + Duration::seconds(3))
        .tags(vec![Tag::new("draft").unwrap(), Tag::new("idea").unwrap()])
        .progress(0.25)
        .status("revising")
        .path(Some(PathBuf::from("Book/Notes.md")))
        .folder("Book")
        .counts(12, 60)
        .content_hash(Some(ContentHash::of_text("hello")))
        .build();
    index.upsert(&r).unwrap();
    assert_eq!(index.get(&r.id()).unwrap(), Some(r));
}

#[test]
fn upsert_replaces_existing() {
    let mut index = index();
    let r = record("Notes", "", 1);
    index.upsert(&r).unwrap();
    let updated = IndexRecord::builder(r.id(), "Renamed", t0(), t0()).build();
    index.upsert(&updated).unwrap();
    assert_eq!(index.all_records().unwrap(), vec![updated]);
}

#[test]
fn remove_is_idempotent() {
    let mut index = index();
    let r = record("Notes", "", 1);
    index.upsert(&r).unwrap();
    assert!(index.remove(&r.id()).unwrap());
    assert!(!index.remove(&r.id()).unwrap());
    assert!(index.get(&r.id()).unwrap().is_none());
}

#[test]
fn trashed_records_are_listed_separately() {
    let mut index = index();
    let live = record("Live", "", 3);
    let gone = IndexRecord::builder(DocumentId::new(), "Gone", t0(), t0())
        .counts(100, 500)
        .trashed(true)
        .build();
    index.upsert(&live).unwrap();
    index.upsert(&gone).unwrap();

    assert_eq!(index.list_all().unwrap(), vec![live]);
    assert_eq!(index.list_trashed().unwrap(), vec![gone]);
    assert_eq!(index.all_records().unwrap().len(), 2);
    assert_eq!(index.aggregate_word_count().unwrap(), 3);
}

// ===== Queries =====

#[test]
fn list_in_folder_matches_exact_folder() {
    let mut index = index();
    index.upsert(&record("Root", "", 1)).unwrap();
    index.upsert(&record("A", "Book", 1)).unwrap();
    index.upsert(&record("B", "Book/Part One", 1)).unwrap();

    let titles = |folder: &str| -> Vec<String> {
        index
            .list_in_folder(folder)
            .unwrap()
            .iter()
            .map(|r| r.title().to_string())
            .collect()
    };
    assert_eq!(titles(""), vec!["Root"]);
    assert_eq!(titles("Book"), vec!["A"]);
    assert_eq!(titles("Book/Part One/"), vec!["B"]);
}

#[test]
fn folders_are_distinct_and_sorted() {
    let mut index = index();
    index.upsert(&record("A", "Drafts", 1)).unwrap();
    index.upsert(&record("B", "Drafts", 1)).unwrap();
    index.upsert(&record("C", "Archive", 1)).unwrap();
    index.upsert(&record("D", "", 1)).unwrap();
    assert_eq!(index.folders().unwrap(), vec!["Archive", "Drafts"]);
}

#[test]
fn search_matches_title_and_tags_case_insensitively() {
    let mut index = index();
    let by_title = record("Chapter One", "", 1);
    let by_tag = IndexRecord::builder(DocumentId::new(), "Misc", t0(), t0())
        .tags(vec![Tag::new("chapter-notes").unwrap()])
        .build();
    index.upsert(&by_title).unwrap();
    index.upsert(&by_tag).unwrap();
    index.upsert(&record("Unrelated", "", 1)).unwrap();

    assert_eq!(index.search("CHAPTER").unwrap().len(), 2);
    assert!(index.search("   ").unwrap().is_empty());
}

#[test]
fn search_escapes_wildcards() {
    let mut index = index();
    index.upsert(&record("100% done", "", 1)).unwrap();
    index.upsert(&record("Other", "", 1)).unwrap();
    assert_eq!(index.search("%").unwrap().len(), 1);
    assert!(index.search("_x").unwrap().is_empty());
}

#[test]
fn set_missing_flags_record() {
    let mut index = index();
    let r = record("Notes", "", 1);
    index.upsert(&r).unwrap();
    index.set_missing(&r.id(), true).unwrap();
    assert!(index.get(&r.id()).unwrap().unwrap().is_missing());
}

// ===== Sync state =====

#[test]
fn last_sync_persists_and_survives_clear() {
    let mut index = index();
    assert_eq!(index.last_sync().unwrap(), None);
    index.upsert(&record("Notes", "", 1)).unwrap();
    index.set_last_sync(t0()).unwrap();
    index.clear().unwrap();
    assert!(index.all_records().unwrap().is_empty());
    assert_eq!(index.last_sync().unwrap(), Some(t0()));
}

#[test]
fn file_backed_index_persists() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("data/index.db");
    let r = record("Notes", "", 4);
    {
        let mut index = SqliteIndex::open(&path).unwrap();
        index.upsert(&r).unwrap();
    }
    let index = SqliteIndex::open(&path).unwrap();
    assert_eq!(index.get(&r.id()).unwrap(), Some(r));
}
