//! Counters produced by sync, maintenance and migration passes.

use serde::Serialize;
use std::ops::AddAssign;

/// Per-pass sync counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Documents that got a new index record.
    pub files_indexed: usize,
    /// Documents whose index record or file was refreshed, moved or rewritten.
    pub files_updated: usize,
    /// Index records removed because nothing backs them any more.
    pub files_removed: usize,
}

impl SyncStats {
    /// True when the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.files_indexed == 0 && self.files_updated == 0 && self.files_removed == 0
    }
}

impl AddAssign for SyncStats {
    fn add_assign(&mut self, rhs: Self) {
        self.files_indexed += rhs.files_indexed;
        self.files_updated += rhs.files_updated;
        self.files_removed += rhs.files_removed;
    }
}

/// How documents are distributed across storage modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Non-trashed documents.
    pub total: usize,
    pub file_backed: usize,
    pub repository_only: usize,
    pub hybrid: usize,
    /// Non-trashed documents with no content at all.
    pub empty: usize,
    pub trashed: usize,
}

/// Result of checking every recorded file path against the disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileIntegrity {
    pub valid: usize,
    pub missing: usize,
}

/// Outcome of the bulk migration to the canonical file layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_noop() {
        assert!(SyncStats::default().is_noop());
    }

    #[test]
    fn add_assign_sums_fields() {
        let mut a = SyncStats {
            files_indexed: 1,
            files_updated: 2,
            files_removed: 0,
        };
        a += SyncStats {
            files_indexed: 0,
            files_updated: 1,
            files_removed: 3,
        };
        assert_eq!(a.files_indexed, 1);
        assert_eq!(a.files_updated, 3);
        assert_eq!(a.files_removed, 3);
        assert!(!a.is_noop());
    }
}
