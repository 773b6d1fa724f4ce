//! Goals and annotations attached to documents.
//!
//! Both are owned by a document and go away with it when it is purged.
//! Progress toward a goal is computed elsewhere; only the target is stored.

use crate::domain::DocumentId;
use chrono::{DateTime, Utc};

/// A writing target for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: i64,
    pub document: DocumentId,
    pub target_words: u32,
    pub deadline: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
}

/// A note pinned to a character range of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: i64,
    pub document: DocumentId,
    pub range_start: u32,
    pub range_end: u32,
    pub text: String,
    pub created: DateTime<Utc>,
}
