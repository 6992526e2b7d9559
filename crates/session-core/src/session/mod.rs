//! Session implementations
//!
//! File offers and calls share [`SessionCore`] by composition. The registry
//! stores them as the [`JingleSession`] sum type and callers that do not care
//! which one they hold use the [`SessionHandle`] capability trait.

mod call;
mod file_offer;
mod shared;

use std::sync::Arc;

use async_trait::async_trait;

pub use self::call::CallSession;
pub use self::shared::SessionCore;
pub use self::file_offer::FileOfferSession;

use crate::contact::Contact;
use crate::signaling::SignalingEvent;
use crate::state::SessionState;
use crate::types::{Direction, SessionId};

/// Operations common to every session kind
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Session id
    fn id(&self) -> &SessionId;

    /// Which side started the session
    fn direction(&self) -> Direction;

    /// Current state
    fn state(&self) -> SessionState;

    /// Remote party
    fn contact(&self) -> &Contact;

    /// Bytes transferred; always zero for calls
    fn transferred_bytes(&self) -> u64;

    /// Cancel the session; returns the resulting state
    async fn cancel(&self) -> SessionState;
}

/// A registered session of either kind
#[derive(Debug, Clone)]
pub enum JingleSession {
    /// File transfer
    File(Arc<FileOfferSession>),
    /// Call leg
    Call(Arc<CallSession>),
}

impl JingleSession {
    /// Shared session state
    pub fn core(&self) -> &SessionCore {
        match self {
            JingleSession::File(s) => s.core(),
            JingleSession::Call(s) => s.core(),
        }
    }

    /// Forward a signaling callback
    pub fn handle_signaling(&self, event: SignalingEvent) {
        match self {
            JingleSession::File(s) => s.handle_signaling(event),
            JingleSession::Call(s) => s.handle_signaling(event),
        }
    }

    /// The file offer, if this is one
    pub fn as_file(&self) -> Option<&Arc<FileOfferSession>> {
        match self {
            JingleSession::File(s) => Some(s),
            JingleSession::Call(_) => None,
        }
    }

    /// The call, if this is one
    pub fn as_call(&self) -> Option<&Arc<CallSession>> {
        match self {
            JingleSession::Call(s) => Some(s),
            JingleSession::File(_) => None,
        }
    }
}

impl From<Arc<FileOfferSession>> for JingleSession {
    fn from(session: Arc<FileOfferSession>) -> Self {
        JingleSession::File(session)
    }
}

impl From<Arc<CallSession>> for JingleSession {
    fn from(session: Arc<CallSession>) -> Self {
        JingleSession::Call(session)
    }
}

#[async_trait]
impl SessionHandle for JingleSession {
    fn id(&self) -> &SessionId {
        self.core().id()
    }

    fn direction(&self) -> Direction {
        self.core().direction()
    }

    fn state(&self) -> SessionState {
        self.core().state()
    }

    fn contact(&self) -> &Contact {
        self.core().contact()
    }

    fn transferred_bytes(&self) -> u64 {
        match self {
            JingleSession::File(s) => s.transferred_bytes(),
            JingleSession::Call(_) => 0,
        }
    }

    async fn cancel(&self) -> SessionState {
        match self {
            JingleSession::File(s) => s.cancel().await,
            JingleSession::Call(s) => s.cancel().await,
        }
    }
}
