//! Session registry
//!
//! Correlates signaling callbacks with the session they belong to. Each live
//! session holds exactly one [`RegistrationHandle`]; it is released when the
//! session reaches a terminal state or is cancelled, after which callbacks
//! for that id are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::errors::{Result, SessionError};
use crate::session::JingleSession;
use crate::signaling::SignalingEvent;
use crate::types::SessionId;

type SessionMap = DashMap<SessionId, JingleSession>;

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Sessions registered
    pub registered: u64,
    /// Sessions unregistered
    pub unregistered: u64,
    /// Callbacks delivered to a session
    pub dispatched: u64,
    /// Callbacks for unknown or finished sessions
    pub dropped: u64,
}

#[derive(Debug)]
struct HandleInner {
    id: SessionId,
    sessions: Weak<SessionMap>,
    stats: Weak<Mutex<RegistryStats>>,
    active: AtomicBool,
}

/// Proof of registration; unregistering is idempotent
#[derive(Debug, Clone)]
pub struct RegistrationHandle {
    inner: Arc<HandleInner>,
}

impl RegistrationHandle {
    /// Id the handle registers
    pub fn session_id(&self) -> &SessionId {
        &self.inner.id
    }

    /// Whether the registration is still in place
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Remove the session from the registry
    ///
    /// Returns true only for the call that actually removed it.
    pub fn unregister(&self) -> bool {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        let Some(sessions) = self.inner.sessions.upgrade() else {
            return false;
        };
        let removed = sessions.remove(&self.inner.id).is_some();
        if removed {
            if let Some(stats) = self.inner.stats.upgrade() {
                stats.lock().unregistered += 1;
            }
            debug!("Unregistered session: {}", self.inner.id);
        }
        removed
    }
}

/// Registry of live sessions keyed by signaling session id
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<SessionMap>,
    stats: Arc<Mutex<RegistryStats>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for signaling callbacks
    pub fn register(&self, session: impl Into<JingleSession>) -> Result<()> {
        let session = session.into();
        let id = session.core().id().clone();

        match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => return Err(SessionError::AlreadyRegistered(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
            }
        }
        self.stats.lock().registered += 1;
        debug!("Registered session: {}", id);

        let handle = RegistrationHandle {
            inner: Arc::new(HandleInner {
                id,
                sessions: Arc::downgrade(&self.sessions),
                stats: Arc::downgrade(&self.stats),
                active: AtomicBool::new(true),
            }),
        };
        session.core().attach_registration(handle);
        Ok(())
    }

    /// Remove a session; returns false if it was not registered
    pub fn unregister(&self, id: &SessionId) -> bool {
        let session = self.sessions.get(id).map(|s| s.clone());
        match session {
            Some(session) => {
                session.core().release();
                true
            }
            None => false,
        }
    }

    /// Look up a session
    pub fn get(&self, id: &SessionId) -> Option<JingleSession> {
        self.sessions.get(id).map(|s| s.clone())
    }

    /// Whether a session is registered
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Deliver a signaling callback to its session
    ///
    /// Returns false when no live session has this id.
    pub fn dispatch(&self, id: &SessionId, event: SignalingEvent) -> bool {
        let session = self.sessions.get(id).map(|s| s.clone());
        let Some(session) = session else {
            trace!("Dropping {:?} for unknown session {}", event, id);
            self.stats.lock().dropped += 1;
            return false;
        };
        self.stats.lock().dispatched += 1;
        session.handle_signaling(event);
        true
    }

    /// Consume callbacks from a channel until it closes
    pub fn spawn_dispatcher(
        &self,
        mut events: mpsc::Receiver<(SessionId, SignalingEvent)>,
    ) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            while let Some((id, event)) = events.recv().await {
                registry.dispatch(&id, event);
            }
            debug!("Signaling event channel closed");
        })
    }

    /// Ids of every registered session
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Counters so far
    pub fn stats(&self) -> RegistryStats {
        *self.stats.lock()
    }
}
