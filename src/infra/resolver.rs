//! Pure mapping from folder ancestry, title and identifier to a file path.
//!
//! Nothing here touches the disk. The resolver only looks at the documents
//! and folders it is given, including each document's currently recorded
//! path, which is what keeps resolution stable across sibling renames.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{Document, DocumentId, Folder, FolderId};
use crate::infra::slug::{disambiguated_file_name, plain_file_name, sanitize_component};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("folder hierarchy contains a cycle at {0}")]
    FolderCycle(FolderId),
}

/// Directory of a folder chain (root first, immediate parent last).
pub fn folder_dir(chain: &[&Folder]) -> PathBuf {
    chain
        .iter()
        .map(|folder| sanitize_component(folder.name()))
        .collect()
}

/// Resolves the canonical relative path for `doc`.
///
/// `chain` is the document's folder ancestry from the root down to its
/// immediate folder. `siblings` are the other live documents resolving to the
/// same directory; the document itself may be included and is ignored.
///
/// When several siblings share a file name (case-insensitively), the one
/// already recorded at the plain name keeps it, failing that the smallest
/// identifier does, and every other one gets ` (xxxxxxxx)` appended from
/// its identifier. A document already sitting at its disambiguated name
/// keeps it.
pub fn resolve_path(doc: &Document, chain: &[&Folder], siblings: &[&Document]) -> PathBuf {
    let dir = folder_dir(chain);
    let base = sanitize_component(doc.title());
    let plain = dir.join(plain_file_name(&base));
    let suffixed = dir.join(disambiguated_file_name(&base, &doc.id()));

    if doc.file_path().is_some_and(|p| same_path(p, &suffixed)) {
        return suffixed;
    }

    let key = base.to_lowercase();
    let mut claimants: Vec<&Document> = siblings
        .iter()
        .copied()
        .filter(|s| s.id() != doc.id() && !s.is_trashed())
        .filter(|s| sanitize_component(s.title()).to_lowercase() == key)
        .filter(|s| !sits_at_own_suffix(s, &dir))
        .collect();

    if claimants.is_empty() {
        return plain;
    }
    claimants.push(doc);

    let winner = claimants
        .iter()
        .filter(|c| c.file_path().is_some_and(|p| same_path(p, &plain)))
        .map(|c| c.id())
        .min()
        .or_else(|| claimants.iter().map(|c| c.id()).min());

    if winner == Some(doc.id()) {
        plain
    } else {
        suffixed
    }
}

/// Resolved paths for a whole library snapshot.
///
/// Built once per pass from every folder and document; trashed documents get
/// no plan since their file lives in the trash.
#[derive(Debug, Default)]
pub struct PathPlanner {
    folder_dirs: HashMap<FolderId, PathBuf>,
    paths: HashMap<DocumentId, PathBuf>,
}

impl PathPlanner {
    /// # Errors
    ///
    /// Returns `PathError::FolderCycle` if any folder's parent chain loops.
    pub fn new(folders: &[Folder], documents: &[Document]) -> Result<Self, PathError> {
        let by_id: HashMap<FolderId, &Folder> = folders.iter().map(|f| (f.id(), f)).collect();

        let mut chains: HashMap<FolderId, Vec<&Folder>> = HashMap::new();
        let mut folder_dirs = HashMap::new();
        for folder in folders {
            let chain = folder_chain(&by_id, Some(folder.id()))?;
            folder_dirs.insert(folder.id(), folder_dir(&chain));
            chains.insert(folder.id(), chain);
        }

        let live: Vec<&Document> = documents.iter().filter(|d| !d.is_trashed()).collect();

        // Group by resolved directory so each document only sees its siblings.
        let mut groups: HashMap<String, Vec<&Document>> = HashMap::new();
        for doc in &live {
            let dir = doc
                .folder()
                .and_then(|f| folder_dirs.get(&f))
                .cloned()
                .unwrap_or_default();
            groups
                .entry(dir.to_string_lossy().to_lowercase())
                .or_default()
                .push(doc);
        }

        let empty = Vec::new();
        let mut paths = HashMap::new();
        for siblings in groups.values() {
            for doc in siblings {
                let chain = doc
                    .folder()
                    .and_then(|f| chains.get(&f))
                    .unwrap_or(&empty);
                paths.insert(doc.id(), resolve_path(doc, chain, siblings));
            }
        }

        Ok(Self { folder_dirs, paths })
    }

    /// Canonical path of a live document.
    pub fn path_for(&self, id: &DocumentId) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    /// Directory of a folder. Unknown folders resolve to `None`.
    pub fn folder_dir(&self, id: &FolderId) -> Option<&Path> {
        self.folder_dirs.get(id).map(PathBuf::as_path)
    }

    pub fn paths(&self) -> impl Iterator<Item = (&DocumentId, &Path)> {
        self.paths.iter().map(|(id, p)| (id, p.as_path()))
    }
}

/// Walks from `start` up to the root and returns the chain root-first.
///
/// A reference to a folder that does not exist ends the chain, so a broken
/// reference resolves at root level.
///
/// # Errors
///
/// Returns `PathError::FolderCycle` if a folder is visited twice.
pub fn folder_chain<'a>(
    folders: &HashMap<FolderId, &'a Folder>,
    start: Option<FolderId>,
) -> Result<Vec<&'a Folder>, PathError> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = start;

    while let Some(id) = cursor {
        let Some(folder) = folders.get(&id) else {
            break;
        };
        if !seen.insert(id) {
            return Err(PathError::FolderCycle(id));
        }
        chain.push(*folder);
        cursor = folder.parent();
    }

    chain.reverse();
    Ok(chain)
}

fn sits_at_own_suffix(doc: &Document, dir: &Path) -> bool {
    let suffixed = dir.join(disambiguated_file_name(
        &sanitize_component(doc.title()),
        &doc.id(),
    ));
    doc.file_path().is_some_and(|p| same_path(p, &suffixed))
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn doc(title: &str, folder: Option<FolderId>) -> Document {
        Document::new(DocumentId::new(), title, folder, now())
    }

    fn folder(name: &str, parent: Option<FolderId>) -> Folder {
        Folder::new(name, parent, now()).unwrap()
    }

    // ===== resolve_path =====

    #[test]
    fn root_document_resolves_to_title() {
        let d = doc("Notes", None);
        assert_eq!(resolve_path(&d, &[], &[]), PathBuf::from("Notes.md"));
    }

    #[test]
    fn nested_folders_form_directory() {
        let book = folder("Book", None);
        let part = folder("Part: One", Some(book.id()));
        let d = doc("Opening", Some(part.id()));
        assert_eq!(
            resolve_path(&d, &[&book, &part], &[]),
            PathBuf::from("Book/Part One/Opening.md")
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let f = folder("Drafts", None);
        let a = doc("Same", Some(f.id()));
        let b = doc("same", Some(f.id()));
        let siblings = [&a, &b];
        assert_eq!(
            resolve_path(&a, &[&f], &siblings),
            resolve_path(&a, &[&f], &siblings)
        );
    }

    #[test]
    fn collision_gives_smaller_id_the_plain_name() {
        let a = doc("Notes", None);
        let b = doc("notes", None);
        let (first, second) = if a.id() < b.id() { (&a, &b) } else { (&b, &a) };
        let siblings = [&a, &b];
        assert_eq!(
            resolve_path(first, &[], &siblings),
            PathBuf::from(plain_file_name(&sanitize_component(first.title())))
        );
        let expected = format!(
            "{} ({}).md",
            sanitize_component(second.title()),
            second.id().short_suffix()
        );
        assert_eq!(resolve_path(second, &[], &siblings), PathBuf::from(expected));
    }

    #[test]
    fn incumbent_keeps_plain_name() {
        let older = doc("Notes", None);
        let mut newer = doc("Notes", None);
        newer.set_file_path(Some(PathBuf::from("Notes.md")));
        // Even if `older` has the smaller id, the file already at the plain
        // name keeps it.
        let siblings = [&older, &newer];
        assert_eq!(resolve_path(&newer, &[], &siblings), PathBuf::from("Notes.md"));
        assert_ne!(resolve_path(&older, &[], &siblings), PathBuf::from("Notes.md"));
    }

    #[test]
    fn renaming_a_sibling_away_keeps_disambiguated_path() {
        let mut a = doc("Notes", None);
        let mut b = doc("Notes", None);
        let siblings = [&a.clone(), &b.clone()];
        let pa = resolve_path(&a, &[], &siblings);
        let pb = resolve_path(&b, &[], &siblings);
        a.set_file_path(Some(pa.clone()));
        b.set_file_path(Some(pb.clone()));

        // Whichever got the plain name is renamed; the other stays put.
        let (plain_holder, other, other_path) = if pa == PathBuf::from("Notes.md") {
            (&mut a, &b, pb)
        } else {
            (&mut b, &a, pa)
        };
        plain_holder.set_title("Elsewhere", now());
        let siblings = [&*plain_holder, other];
        assert_eq!(resolve_path(other, &[], &siblings), other_path);
    }

    #[test]
    fn trashed_siblings_do_not_collide() {
        let a = doc("Notes", None);
        let mut b = doc("Notes", None);
        b.mark_trashed(now(), Some(PathBuf::from(".trash/Notes.md")));
        assert_eq!(resolve_path(&a, &[], &[&a, &b]), PathBuf::from("Notes.md"));
    }

    // ===== PathPlanner =====

    #[test]
    fn planner_resolves_every_live_document() {
        let drafts = folder("Drafts", None);
        let docs = vec![
            doc("One", Some(drafts.id())),
            doc("Two", None),
            {
                let mut t = doc("Gone", None);
                t.mark_trashed(now(), None);
                t
            },
        ];
        let planner = PathPlanner::new(&[drafts.clone()], &docs).unwrap();
        assert_eq!(
            planner.path_for(&docs[0].id()),
            Some(Path::new("Drafts/One.md"))
        );
        assert_eq!(planner.path_for(&docs[1].id()), Some(Path::new("Two.md")));
        assert_eq!(planner.path_for(&docs[2].id()), None);
        assert_eq!(planner.folder_dir(&drafts.id()), Some(Path::new("Drafts")));
    }

    #[test]
    fn planner_gives_colliding_siblings_distinct_paths() {
        let docs = vec![doc("Notes", None), doc("NOTES", None), doc("notes", None)];
        let planner = PathPlanner::new(&[], &docs).unwrap();
        let unique: HashSet<String> = planner
            .paths()
            .map(|(_, p)| p.to_string_lossy().to_lowercase())
            .collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn broken_folder_reference_resolves_at_root() {
        let d = doc("Lost", Some(FolderId::new()));
        let planner = PathPlanner::new(&[], std::slice::from_ref(&d)).unwrap();
        assert_eq!(planner.path_for(&d.id()), Some(Path::new("Lost.md")));
    }

    #[test]
    fn cycle_is_an_error() {
        let mut a = folder("A", None);
        let mut b = folder("B", Some(a.id()));
        a.set_parent(Some(b.id()), now());
        b.set_parent(Some(a.id()), now());
        assert!(matches!(
            PathPlanner::new(&[a, b], &[]),
            Err(PathError::FolderCycle(_))
        ));
    }
}
