use crate::domain::{MaintenanceIssue, Severity, StorageStats};
use crate::error::ItemError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// How much a maintenance pass looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckDepth {
    /// Critical issues only.
    Quick,
    Full,
}

/// Findings of one maintenance pass.
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub depth: CheckDepth,
    pub checked_at: DateTime<Utc>,
    /// Issues still present when the pass finished.
    pub issues: Vec<MaintenanceIssue>,
    /// Issues repaired by auto-fix during this pass.
    pub fixed: Vec<MaintenanceIssue>,
    /// Fixes that were attempted and failed.
    pub errors: Vec<ItemError>,
    /// Storage distribution, computed by full passes only.
    pub storage: Option<StorageStats>,
    pub cancelled: bool,
}

impl MaintenanceReport {
    pub(crate) fn new(depth: CheckDepth, checked_at: DateTime<Utc>) -> Self {
        Self {
            depth,
            checked_at,
            issues: Vec::new(),
            fixed: Vec::new(),
            errors: Vec::new(),
            storage: None,
            cancelled: false,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(MaintenanceIssue::is_critical)
    }

    /// Number of remaining issues at or above `severity`.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity >= severity).count()
    }

    pub fn auto_fixable(&self) -> impl Iterator<Item = &MaintenanceIssue> {
        self.issues.iter().filter(|i| i.can_auto_fix)
    }
}
