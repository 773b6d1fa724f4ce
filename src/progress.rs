//! Progress reporting and cancellation for long-running passes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What happened to one item of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Already consistent; nothing written.
    Unchanged,
    /// Something was written or repaired.
    Changed,
    /// Skipped after a per-item failure.
    Failed(String),
}

/// Receives progress updates during sync, maintenance and index passes.
pub trait ProgressReporter {
    /// Called once before the first item.
    fn on_start(&mut self, _operation: &str, _total: usize) {}
    /// Called after each item.
    fn on_item(&mut self, item: &str, outcome: &ItemOutcome);
    /// Called when the pass finishes, cancelled or not.
    fn on_complete(&mut self, changed: usize, errors: usize);
}

/// A reporter that ignores everything.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_item(&mut self, _item: &str, _outcome: &ItemOutcome) {}
    fn on_complete(&mut self, _changed: usize, _errors: usize) {}
}

/// Shared flag that asks a running pass to stop between items.
///
/// Work already applied is left as-is; every step is re-derived from current
/// state on the next run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
