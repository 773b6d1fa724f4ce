use crate::progress::{ItemOutcome, ProgressReporter};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The pass currently running, for progress indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassStatus {
    pub operation: String,
    /// `0.0..=1.0`.
    pub fraction: f64,
}

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mirrors progress into the shared status slot, then forwards it.
pub(crate) struct Tracking<'a, P: ?Sized> {
    status: &'a Mutex<Option<PassStatus>>,
    inner: &'a mut P,
    total: usize,
    done: usize,
}

impl<'a, P: ProgressReporter + ?Sized> Tracking<'a, P> {
    pub(crate) fn new(status: &'a Mutex<Option<PassStatus>>, inner: &'a mut P) -> Self {
        Self {
            status,
            inner,
            total: 0,
            done: 0,
        }
    }

    fn publish(&self, operation: Option<&str>, fraction: f64) {
        let mut slot = lock(self.status);
        match (slot.as_mut(), operation) {
            (Some(current), Some(op)) => {
                current.operation = op.to_string();
                current.fraction = fraction;
            }
            (Some(current), None) => current.fraction = fraction,
            (None, _) => {}
        }
    }
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for Tracking<'_, P> {
    fn on_start(&mut self, operation: &str, total: usize) {
        self.total = total;
        self.done = 0;
        self.publish(Some(operation), 0.0);
        self.inner.on_start(operation, total);
    }

    fn on_item(&mut self, item: &str, outcome: &ItemOutcome) {
        self.done += 1;
        let fraction = if self.total == 0 {
            1.0
        } else {
            (self.done as f64 / self.total as f64).min(1.0)
        };
        self.publish(None, fraction);
        self.inner.on_item(item, outcome);
    }

    fn on_complete(&mut self, changed: usize, errors: usize) {
        self.publish(None, 1.0);
        self.inner.on_complete(changed, errors);
    }
}
