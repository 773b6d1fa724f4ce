//! Isolated test environment with temp directory.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use super::QuireCommand;
use chrono::Utc;
use quire::domain::{DocumentId, FolderId, StorageMode};
use quire::infra::{DocumentHeader, serialize};
use quire::{Library, LibraryOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated library root plus a separate config home, both removed on drop.
pub struct TestEnv {
    _temp_dir: TempDir,
    root: PathBuf,
    config_home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("library");
        let config_home = temp_dir.path().join("config");
        std::fs::create_dir_all(&root).expect("Failed to create library root");
        std::fs::create_dir_all(&config_home).expect("Failed to create config home");
        Self {
            _temp_dir: temp_dir,
            root,
            config_home,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens a library handle over this environment's root.
    pub fn library(&self) -> Library {
        Library::open(LibraryOptions::new(&self.root)).expect("Failed to open library")
    }

    /// Creates a repository-mode document with content, without syncing.
    pub fn add_document(
        &self,
        library: &Library,
        title: &str,
        folder: Option<FolderId>,
        content: &str,
    ) -> DocumentId {
        let doc = library
            .create_document(title, folder, StorageMode::Repository)
            .expect("Failed to create document");
        library
            .write_content(&doc.id(), content)
            .expect("Failed to write content");
        doc.id()
    }

    /// Writes raw text at a root-relative path, creating parents.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Writes a document file with front-matter for an identifier no
    /// repository knows about.
    pub fn write_foreign_document(&self, relative: &str, title: &str, body: &str) -> DocumentId {
        let now = Utc::now();
        let header = DocumentHeader {
            id: DocumentId::new(),
            title: title.to_string(),
            created: now,
            modified: now,
            tags: Vec::new(),
            status: None,
        };
        self.write_file(relative, &serialize(&header, body));
        header.id
    }

    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root.join(relative))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", relative, e))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    /// Creates a QuireCommand configured for this test environment.
    pub fn cmd(&self) -> QuireCommand {
        QuireCommand::new()
            .config_home(&self.config_home)
            .dir(&self.root)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
