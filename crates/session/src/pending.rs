//! Pending-command registry.
//!
//! Tracks commands awaiting their result, keyed by request id. Resolution is
//! at-most-once: the relay-response path and the broadcast path may race for
//! the same id, and duplicate broker deliveries happen, so insert and remove
//! run under one mutex and removal is the only terminal transition.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;
use vaclink_core::Event;

struct PendingEntry {
    created_at: Instant,
    tx: oneshot::Sender<Event>,
}

/// Registry of commands awaiting a correlated result.
///
/// The registry enforces no timeout of its own; the owning session abandons
/// stale entries when it terminates.
#[derive(Default)]
pub struct PendingCommands {
    inner: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command and obtain the receiver its result will arrive on.
    ///
    /// Registering an id that is already outstanding replaces the old entry;
    /// its receiver resolves as abandoned.
    pub fn register(&self, id: &str) -> oneshot::Receiver<Event> {
        let (tx, rx) = oneshot::channel();
        let entry = PendingEntry {
            created_at: Instant::now(),
            tx,
        };
        let mut inner = self.inner.lock().expect("pending registry poisoned");
        if inner.insert(id.to_string(), entry).is_some() {
            debug!(id, "replaced outstanding pending entry");
        }
        rx
    }

    /// Resolve a pending entry with its result.
    ///
    /// Returns `true` if a matching entry existed and was removed. A second
    /// resolve for the same id is a no-op returning `false`.
    pub fn resolve(&self, id: &str, event: Event) -> bool {
        let entry = {
            let mut inner = self.inner.lock().expect("pending registry poisoned");
            inner.remove(id)
        };
        match entry {
            Some(entry) => {
                debug!(
                    id,
                    elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                    event = %event.name,
                    "resolved pending command"
                );
                // The caller may have dropped the ticket; that is fine.
                let _ = entry.tx.send(event);
                true
            }
            None => false,
        }
    }

    /// Drop a pending entry without resolving it. Absent ids are a no-op.
    pub fn discard(&self, id: &str) {
        let mut inner = self.inner.lock().expect("pending registry poisoned");
        inner.remove(id);
    }

    /// Abandon all pending entries, returning how many were dropped.
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock().expect("pending registry poisoned");
        let count = inner.len();
        inner.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("pending registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
