//! Debounced autosave and coalesced quick-sync triggers.

use super::Library;
use crate::domain::DocumentId;
use crate::sync::Debouncer;
use std::time::Duration;
use tracing::{debug, warn};

/// Coalesces rapid edits into one repository save per document.
///
/// Each document has a single pending slot, replaced on every edit and saved
/// once the document has been quiet for the autosave delay. Dropping the
/// session saves whatever is still pending.
pub struct EditSession {
    debouncer: Debouncer<DocumentId, String>,
}

impl EditSession {
    pub(crate) fn new(library: Library, delay: Duration) -> Self {
        let debouncer = Debouncer::new(delay, move |id: DocumentId, text: String| {
            match library.write_content(&id, &text) {
                Ok(doc) => debug!(id = %id, words = doc.word_count(), "autosaved"),
                Err(err) => warn!(id = %id, error = %err, "autosave failed"),
            }
        });
        Self { debouncer }
    }

    pub fn edit(&self, id: DocumentId, text: impl Into<String>) {
        self.debouncer.submit(id, text.into());
    }

    /// Saves every pending edit now instead of after the delay.
    pub fn flush(&self) {
        self.debouncer.flush_now();
    }

    pub fn pending(&self) -> usize {
        self.debouncer.pending_len()
    }
}

/// Collapses repeated quick-sync requests within the debounce window into
/// one pass.
///
/// A request made while a pass is running waits for it and then runs.
pub struct SyncTrigger {
    debouncer: Debouncer<(), ()>,
}

impl SyncTrigger {
    pub(crate) fn new(library: Library, delay: Duration) -> Self {
        let debouncer = Debouncer::new(delay, move |(), ()| match library.perform_quick_sync() {
            Ok(report) => debug!(
                indexed = report.stats.files_indexed,
                updated = report.stats.files_updated,
                "triggered quick sync finished"
            ),
            Err(err) => warn!(error = %err, "triggered quick sync failed"),
        });
        Self { debouncer }
    }

    pub fn request(&self) {
        self.debouncer.submit((), ());
    }

    pub fn flush(&self) {
        self.debouncer.flush_now();
    }
}
