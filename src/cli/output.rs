//! Output format types for CLI commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::domain::{DocumentId, StorageMode};
use crate::index::IndexRecord;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for programmatic consumption
    Json,
}

/// Wrapper for serializable command output.
#[derive(Debug, Serialize)]
pub struct Output<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> Output<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    pub fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// A single document in listing output.
#[derive(Debug, Serialize)]
pub struct DocumentListing {
    pub id: String,
    pub title: String,
    pub folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub words: u32,
    pub modified: DateTime<Utc>,
}

impl From<&IndexRecord> for DocumentListing {
    fn from(record: &IndexRecord) -> Self {
        Self {
            id: record.id().to_string(),
            title: record.title().to_string(),
            folder: record.folder().to_string(),
            path: record.path().map(|p| p.to_string_lossy().into_owned()),
            words: record.word_count(),
            modified: record.modified(),
        }
    }
}

/// A created or changed document.
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub mode: StorageMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
