//! Command handlers for the CLI.

mod documents;
mod folders;
mod health;
mod list;
mod sync;
mod trash;


use crate::error::ItemError;
use crate::progress::{ItemOutcome, ProgressReporter};

pub use documents::{handle_new, handle_show, handle_write};
pub use folders::{handle_mkdir, handle_move_folder, handle_rename_folder};
pub use health::{handle_health, handle_stats, handle_verify};
pub use list::{handle_files, handle_folders, handle_list, handle_search};
pub use sync::{handle_index, handle_migrate, handle_sync};
pub use trash::{handle_empty_trash, handle_purge, handle_restore, handle_trash};

// ===========================================
// Shared Utilities
// ===========================================

/// Progress reporter that prints to stderr.
pub(crate) struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub(crate) fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_start(&mut self, operation: &str, total: usize) {
        if self.verbose {
            eprintln!("{}: {} item(s)", operation, total);
        }
    }

    fn on_item(&mut self, item: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Changed if self.verbose => eprintln!("  changed: {}", item),
            ItemOutcome::Unchanged | ItemOutcome::Changed => {}
            ItemOutcome::Failed(msg) => eprintln!("  error: {}: {}", item, msg),
        }
    }

    fn on_complete(&mut self, _changed: usize, _errors: usize) {}
}

/// Prints per-item failures collected by a pass.
pub(crate) fn print_item_errors(errors: &[ItemError]) {
    for error in errors {
        eprintln!("  error: {}", error);
    }
}

/// Truncates a string to a maximum display width, adding ellipsis if needed.
pub(crate) fn truncate_str(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
