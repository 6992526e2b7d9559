//! State shared by every session variant

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use crate::contact::Contact;
use crate::events::{ObserverHandle, ObserverSet, ProgressEvent, SessionObserver, SessionStatusEvent};
use crate::registry::RegistrationHandle;
use crate::state::{SessionState, TerminationReason};
use crate::types::{Direction, SessionId};

#[derive(Debug)]
struct StateCell {
    state: SessionState,
    reason: Option<TerminationReason>,
    detail: Option<String>,
}

/// Identity, state machine and observers of one session
///
/// Transitions of one session are serialized and their notifications are
/// delivered in transition order. The ordering lock is reentrant, so an
/// observer may drive the same session from inside its callback.
#[derive(Debug)]
pub struct SessionCore {
    id: SessionId,
    direction: Direction,
    contact: Contact,
    cell: Mutex<StateCell>,
    ordering: ReentrantMutex<()>,
    observers: ObserverSet<dyn SessionObserver>,
    registration: Mutex<Option<RegistrationHandle>>,
    created_at: DateTime<Utc>,
}

impl SessionCore {
    pub(crate) fn new(id: SessionId, direction: Direction, contact: Contact, initial: SessionState) -> Self {
        Self {
            id,
            direction,
            contact,
            cell: Mutex::new(StateCell {
                state: initial,
                reason: None,
                detail: None,
            }),
            ordering: ReentrantMutex::new(()),
            observers: ObserverSet::new(),
            registration: Mutex::new(None),
            created_at: Utc::now(),
        }
    }

    /// Session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Which side started the session
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Remote party
    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.cell.lock().state
    }

    /// Reason of the terminal transition, if any
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.cell.lock().reason.clone()
    }

    /// Diagnostic text of the last transition
    pub fn detail(&self) -> Option<String> {
        self.cell.lock().detail.clone()
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Register a status observer
    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) -> ObserverHandle {
        self.observers.add(observer)
    }

    /// Deregister a status observer
    pub fn remove_observer(&self, handle: ObserverHandle) -> bool {
        self.observers.remove(handle)
    }

    /// Whether the session is still registered for signaling callbacks
    pub fn is_registered(&self) -> bool {
        self.registration
            .lock()
            .as_ref()
            .map_or(false, RegistrationHandle::is_active)
    }

    /// Move to `new`, firing one status notification
    ///
    /// Returns false, without notifying, when the transition is not allowed.
    /// Entering a terminal state releases the registry registration first.
    pub(crate) fn transition(
        &self,
        new: SessionState,
        reason: Option<TerminationReason>,
        detail: Option<String>,
    ) -> bool {
        let _ordered = self.ordering.lock();
        let old = {
            let mut cell = self.cell.lock();
            if !cell.state.can_transition_to(new) {
                trace!("Session {} ignores {} -> {}", self.id, cell.state, new);
                return false;
            }
            let old = cell.state;
            cell.state = new;
            if reason.is_some() {
                cell.reason = reason.clone();
            }
            cell.detail = detail.clone();
            old
        };

        debug!("Session {} state: {} -> {}", self.id, old, new);
        if new.is_terminal() {
            self.release();
        }

        let event = SessionStatusEvent {
            session_id: self.id.clone(),
            old_state: old,
            new_state: new,
            reason,
            detail,
            timestamp: Utc::now(),
        };
        self.observers.notify(|o| o.on_status_changed(&event));
        true
    }

    pub(crate) fn notify_progress(&self, transferred: u64) {
        let event = ProgressEvent {
            session_id: self.id.clone(),
            transferred,
            timestamp: Utc::now(),
        };
        self.observers.notify(|o| o.on_progress(&event));
    }

    /// Keep the registry registration so it can be released on termination
    ///
    /// A session that already ended is unregistered right away.
    pub(crate) fn attach_registration(&self, handle: RegistrationHandle) {
        let terminal = {
            let _ordered = self.ordering.lock();
            let terminal = self.state().is_terminal();
            if !terminal {
                *self.registration.lock() = Some(handle.clone());
            }
            terminal
        };
        if terminal {
            handle.unregister();
        }
    }

    /// Drop the registry registration; safe to call repeatedly
    pub(crate) fn release(&self) {
        let handle = self.registration.lock().take();
        if let Some(handle) = handle {
            if handle.unregister() {
                trace!("Session {} unregistered", self.id);
            }
        }
    }
}
