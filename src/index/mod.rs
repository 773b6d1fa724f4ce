//! Index store: a disposable, denormalised cache of document metadata.

mod builder;
mod repository;
mod schema;
mod sqlite;

pub use builder::{BuildError, BuildResult, IndexBuilder};
pub use repository::{
    IndexError, IndexRecord, IndexRecordBuilder, IndexResult, IndexStore, folder_of,
    folder_string,
};
pub use schema::{create_schema, get_schema_version};
pub use sqlite::SqliteIndex;
