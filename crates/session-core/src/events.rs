//! Session status and progress notifications
//!
//! Observers are registered on an [`ObserverSet`] and get back a handle for
//! deregistration. Dispatch works on a snapshot of the set, so an observer
//! may deregister itself, or anyone else, from inside its callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::state::{SessionState, TerminationReason};
use crate::types::SessionId;

/// A session state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusEvent {
    /// Session that changed
    pub session_id: SessionId,
    /// State before the transition
    pub old_state: SessionState,
    /// State after the transition
    pub new_state: SessionState,
    /// Termination reason, for transitions into a terminal state
    pub reason: Option<TerminationReason>,
    /// Free text diagnostic
    pub detail: Option<String>,
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
}

/// Byte progress of a file transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Session reporting progress
    pub session_id: SessionId,
    /// Bytes transferred so far
    pub transferred: u64,
    /// When the progress was observed
    pub timestamp: DateTime<Utc>,
}

/// Receives session notifications
///
/// Terminal notifications may be delivered more than once when local and
/// remote cancellation race, so implementations must tolerate duplicates.
pub trait SessionObserver: Send + Sync {
    /// A state transition happened
    fn on_status_changed(&self, event: &SessionStatusEvent);

    /// Transferred byte count increased
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Registration handle returned by [`ObserverSet::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

/// Set of observers of type `T`
pub struct ObserverSet<T: ?Sized> {
    observers: RwLock<Vec<(ObserverHandle, Arc<T>)>>,
    next_id: AtomicU64,
}

impl<T: ?Sized> ObserverSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an observer
    pub fn add(&self, observer: Arc<T>) -> ObserverHandle {
        let handle = ObserverHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((handle, observer));
        handle
    }

    /// Deregister an observer; returns false if it was not registered
    pub fn remove(&self, handle: ObserverHandle) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(h, _)| *h != handle);
        observers.len() != before
    }

    /// Drop every observer
    pub fn clear(&self) {
        self.observers.write().clear();
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether no observer is registered
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Call `f` for each observer registered at the time of the call
    pub fn notify(&self, mut f: impl FnMut(&T)) {
        let snapshot: Vec<Arc<T>> = self.observers.read().iter().map(|(_, o)| o.clone()).collect();
        for observer in snapshot {
            f(&observer);
        }
    }
}

impl<T: ?Sized> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for ObserverSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet").field("len", &self.len()).finish()
    }
}
