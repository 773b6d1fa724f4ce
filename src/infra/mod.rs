//! File I/O, front-matter codec, path resolution, safety backups

mod backup;
mod content_hash;
mod frontmatter;
mod fs;
mod resolver;
mod slug;

pub use backup::{Backup, create_backup};
pub use content_hash::{ContentHash, ContentHashError};
pub use frontmatter::{DocumentHeader, ParseError, ParsedFile, parse, serialize};
pub use fs::{FileStore, FileStoreError, FileStoreResult, TRASH_DIR};
pub use resolver::{PathError, PathPlanner, folder_chain, folder_dir, resolve_path};
pub use slug::{
    DOCUMENT_EXTENSION, MAX_COMPONENT_LEN, disambiguated_file_name, plain_file_name,
    sanitize_component,
};
