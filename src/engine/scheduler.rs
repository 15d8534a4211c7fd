//! Deferred actions on the audio clock.
//!
//! A [`Scheduler`] holds payloads that become due at an absolute audio-clock
//! time. Whoever owns it polls [`Scheduler::take_due`] from its control loop;
//! nothing here spawns threads or sleeps. Each scheduled entry hands back a
//! [`TaskHandle`] that can cancel it before it fires.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation handle for one scheduled action.
///
/// Clones refer to the same action. Cancelling is idempotent and may be
/// done from any thread.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct Entry<T> {
    due: f64,
    handle: TaskHandle,
    payload: T,
}

/// Time-ordered queue of cancellable deferred actions.
#[derive(Debug)]
pub struct Scheduler<T> {
    /// Sorted by `due`; equal times keep scheduling order.
    entries: Vec<Entry<T>>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Enqueue `payload` to become due at `due` (audio-clock seconds).
    pub fn schedule(&mut self, due: f64, payload: T) -> TaskHandle {
        let handle = TaskHandle::new();
        let idx = self.entries.partition_point(|e| e.due <= due);
        self.entries.insert(
            idx,
            Entry {
                due,
                handle: handle.clone(),
                payload,
            },
        );
        handle
    }

    /// Remove and return every non-cancelled payload due at or before `now`,
    /// earliest first. Cancelled entries are discarded whenever seen.
    pub fn take_due(&mut self, now: f64) -> Vec<T> {
        self.entries.retain(|e| !e.handle.is_cancelled());
        let due = self.entries.partition_point(|e| e.due <= now);
        self.entries.drain(..due).map(|e| e.payload).collect()
    }

    /// Earliest due time among live entries.
    pub fn next_due(&self) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| !e.handle.is_cancelled())
            .map(|e| e.due)
    }

    /// Live (not cancelled) entries.
    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    /// Cancel and drop everything.
    pub fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            entry.handle.cancel();
        }
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
