//! Front-matter codec for document files.
//!
//! Every document file starts with a YAML header carrying the document's
//! identifier, which is what ties a bare file back to its document when the
//! repository is unavailable.

use crate::domain::{DEFAULT_STATUS, Document, DocumentId, Tag};
use crate::infra::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata written at the top of every document file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub id: DocumentId,
    pub title: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DocumentHeader {
    /// Builds the header for a document as it currently stands.
    pub fn for_document(doc: &Document) -> Self {
        let status = (!doc.status().is_empty() && doc.status() != DEFAULT_STATUS)
            .then(|| doc.status().to_string());
        Self {
            id: doc.id(),
            title: doc.title().to_string(),
            created: doc.created(),
            modified: doc.modified(),
            tags: doc.tags().to_vec(),
            status,
        }
    }

    /// Status with the default applied.
    pub fn status_or_default(&self) -> &str {
        self.status.as_deref().unwrap_or(DEFAULT_STATUS)
    }
}

/// Result of parsing a document file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub header: DocumentHeader,
    pub body: String,
    pub content_hash: ContentHash,
}

/// Errors during front-matter parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing opening front-matter delimiter '---'")]
    MissingOpeningDelimiter,

    #[error("missing closing front-matter delimiter '---'")]
    MissingClosingDelimiter,

    #[error("invalid YAML in front-matter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// Parses a document file's text.
///
/// The body is returned byte-for-byte as it appears after the closing
/// delimiter line.
///
/// # Errors
///
/// Returns `ParseError` if the delimiters are missing or the YAML is invalid
/// (including a missing or malformed `id`).
pub fn parse(content: &str) -> Result<ParsedFile, ParseError> {
    parse_with_hash(content, ContentHash::compute(content.as_bytes()))
}

/// Parses with a hash computed by the caller from the raw file bytes.
pub(crate) fn parse_with_hash(
    content: &str,
    content_hash: ContentHash,
) -> Result<ParsedFile, ParseError> {
    let after_opening = if content.starts_with("---\r\n") {
        5
    } else if content.starts_with("---\n") {
        4
    } else if content == "---" {
        return Err(ParseError::MissingClosingDelimiter);
    } else {
        return Err(ParseError::MissingOpeningDelimiter);
    };

    let rest = &content[after_opening..];
    let closing = find_closing_delimiter(rest)?;
    let yaml = &rest[..closing];

    let tail = &rest[closing..];
    let body_start = if tail.starts_with("---\r\n") {
        closing + 5
    } else if tail.starts_with("---\n") {
        closing + 4
    } else {
        closing + 3
    };
    let body = rest.get(body_start..).unwrap_or_default().to_string();

    let header: DocumentHeader = serde_yaml::from_str(yaml)?;

    Ok(ParsedFile {
        header,
        body,
        content_hash,
    })
}

/// Serialises a header and body into file text.
pub fn serialize(header: &DocumentHeader, body: &str) -> String {
    let yaml = serde_yaml::to_string(header).expect("header serialization is infallible");
    format!("---\n{}---\n{}", yaml, body)
}

/// Finds the start of a line that is exactly `---`.
fn find_closing_delimiter(content: &str) -> Result<usize, ParseError> {
    let bytes = content.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        if content[pos..].starts_with("---") {
            let after = pos + 3;
            if after >= bytes.len()
                || bytes[after] == b'\n'
                || (bytes[after] == b'\r' && bytes.get(after + 1) == Some(&b'\n'))
            {
                return Ok(pos);
            }
        }

        match content[pos..].find('\n') {
            Some(offset) => pos += offset + 1,
            None => break,
        }
    }

    Err(ParseError::MissingClosingDelimiter)
}
