//! Session error types
//!
//! Transport and signaling failures are normally absorbed at the session
//! boundary and turned into a terminal state. The variants below reach callers
//! only for misuse (accepting an outgoing offer, accepting twice) and for
//! problems detected before any signaling happens.

use std::path::PathBuf;

use thiserror::Error;

use crate::state::{SessionState, TerminationReason};
use crate::types::Direction;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session with this id is registered
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A session with this id is already registered
    #[error("Session already registered: {0}")]
    AlreadyRegistered(String),

    /// The requested state change is not allowed
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    /// `accept` was already called on this session
    #[error("Session {0} was already accepted")]
    AlreadyAccepted(String),

    /// The operation does not apply to this side of the session
    #[error("{operation} is not available on {direction} sessions")]
    WrongDirection {
        operation: &'static str,
        direction: Direction,
    },

    /// The file exceeds the transfer size limit
    #[error("File {path} is {size} bytes, limit is {max}")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    /// Local file system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the signaling layer
    #[error("Signaling error: {0}")]
    Signaling(#[from] SignalingError),
}

impl SessionError {
    /// Create a session not found error
    pub fn session_not_found(id: impl Into<String>) -> Self {
        SessionError::SessionNotFound(id.into())
    }
}

/// Failures surfaced by the external Jingle signaling layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalingError {
    /// The remote side no longer knows the session (`item-not-found`)
    #[error("item-not-found")]
    ItemNotFound,

    /// The XMPP connection is down
    #[error("not connected")]
    NotConnected,

    /// No reply arrived in time
    #[error("no response")]
    NoResponse,

    /// The remote side rejected the request
    #[error("rejected: {0}")]
    Rejected(String),

    /// Any other protocol level failure
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SignalingError {
    /// Termination reason recorded when this failure ends a session
    pub fn termination_reason(&self) -> TerminationReason {
        match self {
            SignalingError::NoResponse => TerminationReason::Timeout,
            SignalingError::NotConnected => TerminationReason::ConnectivityError,
            SignalingError::Rejected(_) => TerminationReason::Decline,
            SignalingError::ItemNotFound | SignalingError::Protocol(_) => TerminationReason::GeneralError,
        }
    }
}
