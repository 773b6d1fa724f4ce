//! Keyed debouncing for autosave and quick-sync triggers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

struct State<K, V> {
    pending: HashMap<K, (V, Instant)>,
    force: bool,
    shutdown: bool,
}

type Shared<K, V> = Arc<(Mutex<State<K, V>>, Condvar)>;

/// Coalesces bursts of submissions per key.
///
/// Each key keeps only its latest value; the value is handed to the flush
/// callback once no newer submission for that key has arrived within the
/// delay. Dropping the debouncer flushes everything still pending, so no
/// submitted value is lost on shutdown.
pub struct Debouncer<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    shared: Shared<K, V>,
    worker: Option<JoinHandle<()>>,
}

impl<K, V> Debouncer<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    pub fn new<F>(delay: Duration, flush: F) -> Self
    where
        F: FnMut(K, V) + Send + 'static,
    {
        let shared: Shared<K, V> = Arc::new((
            Mutex::new(State {
                pending: HashMap::new(),
                force: false,
                shutdown: false,
            }),
            Condvar::new(),
        ));
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || run(worker_shared, delay, flush));
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Replaces any pending value for `key` and restarts its delay.
    pub fn submit(&self, key: K, value: V) {
        let (lock, cvar) = &*self.shared;
        lock_state(lock).pending.insert(key, (value, Instant::now()));
        cvar.notify_one();
    }

    /// Makes every pending value due immediately.
    pub fn flush_now(&self) {
        let (lock, cvar) = &*self.shared;
        lock_state(lock).force = true;
        cvar.notify_one();
    }

    pub fn pending_len(&self) -> usize {
        lock_state(&self.shared.0).pending.len()
    }
}

impl<K, V> Drop for Debouncer<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    fn drop(&mut self) {
        let (lock, cvar) = &*self.shared;
        lock_state(lock).shutdown = true;
        cvar.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn lock_state<K, V>(lock: &Mutex<State<K, V>>) -> MutexGuard<'_, State<K, V>> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run<K, V, F>(shared: Shared<K, V>, delay: Duration, mut flush: F)
where
    K: Eq + Hash + Clone,
    F: FnMut(K, V),
{
    let (lock, cvar) = &*shared;
    let mut state = lock_state(lock);
    loop {
        if state.shutdown {
            let remaining: Vec<(K, V)> = state.pending.drain().map(|(k, (v, _))| (k, v)).collect();
            drop(state);
            debug!(count = remaining.len(), "flushing pending values on shutdown");
            for (key, value) in remaining {
                flush(key, value);
            }
            return;
        }

        let now = Instant::now();
        let force = std::mem::take(&mut state.force);
        let due: Vec<K> = state
            .pending
            .iter()
            .filter(|(_, (_, at))| force || now.duration_since(*at) >= delay)
            .map(|(k, _)| k.clone())
            .collect();

        if !due.is_empty() {
            let ready: Vec<(K, V)> = due
                .into_iter()
                .filter_map(|k| state.pending.remove(&k).map(|(v, _)| (k, v)))
                .collect();
            // The callback may be slow; never hold the lock across it.
            drop(state);
            for (key, value) in ready {
                flush(key, value);
            }
            state = lock_state(lock);
            continue;
        }

        let next_wait = state
            .pending
            .values()
            .map(|(_, at)| (*at + delay).saturating_duration_since(now))
            .min();
        state = match next_wait {
            Some(wait) => {
                cvar.wait_timeout(state, wait)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => cvar.wait(state).unwrap_or_else(PoisonError::into_inner),
        };
    }
}
