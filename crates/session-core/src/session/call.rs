//! Call sessions
//!
//! Same state machine as file offers without byte progress. Hanging up an
//! active call ends it; cancelling one that never connected cancels it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::contact::Contact;
use crate::errors::{Result, SessionError, SignalingError};
use crate::events::{ObserverHandle, SessionObserver};
use crate::session::file_offer::failure_state;
use crate::session::{SessionCore, SessionHandle};
use crate::signaling::{JingleSignaling, SignalingEvent};
use crate::state::{SessionState, TerminationReason};
use crate::types::{Direction, SessionId};

/// One call leg
pub struct CallSession {
    core: SessionCore,
    accepted: AtomicBool,
    signaling: Arc<dyn JingleSignaling>,
}

impl CallSession {
    /// A call we are about to place
    pub fn outgoing(id: SessionId, contact: Contact, signaling: Arc<dyn JingleSignaling>) -> Arc<Self> {
        Arc::new(Self {
            core: SessionCore::new(id, Direction::Outgoing, contact, SessionState::Fresh),
            accepted: AtomicBool::new(false),
            signaling,
        })
    }

    /// A call offered by `contact`
    pub fn incoming(id: SessionId, contact: Contact, signaling: Arc<dyn JingleSignaling>) -> Arc<Self> {
        Arc::new(Self {
            core: SessionCore::new(id, Direction::Incoming, contact, SessionState::Pending),
            accepted: AtomicBool::new(false),
            signaling,
        })
    }

    /// Shared session state
    pub fn core(&self) -> &SessionCore {
        &self.core
    }

    /// Register a status observer
    pub fn observe(&self, observer: Arc<dyn SessionObserver>) -> ObserverHandle {
        self.core.add_observer(observer)
    }

    /// Send the session-initiate
    pub async fn initiate(&self) -> Result<SessionState> {
        if self.core.direction() != Direction::Outgoing {
            return Err(SessionError::WrongDirection {
                operation: "initiate",
                direction: self.core.direction(),
            });
        }
        if self.core.state() != SessionState::Fresh {
            return Ok(self.core.state());
        }

        match self
            .signaling
            .send_call_initiate(self.core.id(), &self.core.contact().address)
            .await
        {
            Ok(()) => {
                self.core.transition(SessionState::Pending, None, Some("Ringing".into()));
            }
            Err(e) => {
                error!("Failed to initiate call {}: {}", self.core.id(), e);
                self.fail(&e);
            }
        }
        Ok(self.core.state())
    }

    /// Answer an incoming call
    pub async fn accept(&self) -> Result<SessionState> {
        if self.core.direction() != Direction::Incoming {
            return Err(SessionError::WrongDirection {
                operation: "accept",
                direction: self.core.direction(),
            });
        }
        let state = self.core.state();
        if state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                from: state,
                to: SessionState::Active,
            });
        }
        if self.accepted.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyAccepted(self.core.id().to_string()));
        }

        match self.signaling.accept_call(self.core.id()).await {
            Ok(()) => {
                self.core.transition(SessionState::Active, None, Some("Call answered".into()));
            }
            Err(e) => {
                error!("Failed to answer call {}: {}", self.core.id(), e);
                self.fail(&e);
            }
        }
        Ok(self.core.state())
    }

    /// Hang up or cancel the call; a no-op once terminal
    pub async fn cancel(&self) -> SessionState {
        let old = self.core.state();
        if old.is_terminal() {
            debug!("Call {} already {}", self.core.id(), old);
            return old;
        }

        let (result, state, reason) = if old == SessionState::Active {
            let result = self
                .signaling
                .terminate(self.core.id(), &TerminationReason::Success, Some("Call hung up"))
                .await;
            (result, SessionState::Ended, TerminationReason::Success)
        } else {
            let result = self.signaling.cancel(self.core.id()).await;
            (result, SessionState::Cancelled, TerminationReason::Cancel)
        };
        if let Err(e) = result {
            warn!("Remote notification for call {} failed: {}", self.core.id(), e);
        }

        self.core.release();
        self.core.transition(state, Some(reason), Some(old.to_string()));
        self.core.state()
    }

    /// Apply a callback from the signaling layer
    pub fn handle_signaling(&self, event: SignalingEvent) {
        match event {
            SignalingEvent::StateChanged(state) => {
                self.core.transition(state, None, Some(format!("Jingle session {}", state)));
            }
            SignalingEvent::Started => {
                self.core.transition(SessionState::Active, None, None);
            }
            SignalingEvent::Progress(_) => {}
            SignalingEvent::Finished => {
                self.core.release();
                self.core
                    .transition(SessionState::Ended, Some(TerminationReason::Success), None);
            }
            SignalingEvent::Error(reason) | SignalingEvent::Terminated(reason) => {
                self.core.release();
                let state = reason.terminal_state();
                self.core.transition(state, Some(reason), None);
            }
        }
    }

    fn fail(&self, error: &SignalingError) {
        self.core.release();
        let reason = error.termination_reason();
        self.core
            .transition(failure_state(&reason), Some(reason), Some(error.to_string()));
    }
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("id", self.core.id())
            .field("direction", &self.core.direction())
            .field("state", &self.core.state())
            .finish()
    }
}

#[async_trait]
impl SessionHandle for CallSession {
    fn id(&self) -> &SessionId {
        self.core.id()
    }

    fn direction(&self) -> Direction {
        self.core.direction()
    }

    fn state(&self) -> SessionState {
        self.core.state()
    }

    fn contact(&self) -> &Contact {
        self.core.contact()
    }

    fn transferred_bytes(&self) -> u64 {
        0
    }

    async fn cancel(&self) -> SessionState {
        CallSession::cancel(self).await
    }
}
