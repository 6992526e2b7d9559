//! Session state machine
//!
//! ```text
//! fresh -> pending -> active -> ended
//!   |         |          |
//!   +---------+----------+---> cancelled | error
//! ```
//!
//! Terminal states absorb: nothing leaves `cancelled`, `ended` or `error`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a Jingle session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing sent yet
    Fresh,
    /// Offer sent or received, awaiting a decision
    Pending,
    /// Accepted, bytes or media flowing
    Active,
    /// Cancelled or declined by either side
    Cancelled,
    /// Completed normally
    Ended,
    /// Failed
    Error,
}

impl SessionState {
    /// Whether the state is final
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Cancelled | SessionState::Ended | SessionState::Error)
    }

    /// Whether moving to `next` is allowed
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (from, to) if from == to => false,
            (Fresh, _) => true,
            (Pending, Fresh) => false,
            (Pending, _) => true,
            (Active, Fresh | Pending) => false,
            (Active, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Fresh => "fresh",
            SessionState::Pending => "pending",
            SessionState::Active => "active",
            SessionState::Cancelled => "cancelled",
            SessionState::Ended => "ended",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Reason carried by a session-terminate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Finished normally
    Success,
    /// The user declined
    Decline,
    /// The remote party is busy
    Busy,
    /// Cancelled by either side
    Cancel,
    /// Negotiation or certificate failure
    SecurityError,
    /// No answer in time
    Timeout,
    /// No usable transport candidates
    ConnectivityError,
    /// Transport negotiation failed
    FailedTransport,
    /// The application payload could not be handled
    FailedApplication,
    /// Unspecified failure
    GeneralError,
    /// Reason not covered above
    Other(String),
}

impl TerminationReason {
    /// Terminal state a termination with this reason leads to
    pub fn terminal_state(&self) -> SessionState {
        match self {
            TerminationReason::Success => SessionState::Ended,
            TerminationReason::Decline | TerminationReason::Busy | TerminationReason::Cancel => {
                SessionState::Cancelled
            }
            _ => SessionState::Error,
        }
    }

    /// Parse the element name used on the wire
    pub fn from_wire(name: &str) -> Self {
        match name {
            "success" => TerminationReason::Success,
            "decline" => TerminationReason::Decline,
            "busy" => TerminationReason::Busy,
            "cancel" => TerminationReason::Cancel,
            "security-error" => TerminationReason::SecurityError,
            "timeout" => TerminationReason::Timeout,
            "connectivity-error" => TerminationReason::ConnectivityError,
            "failed-transport" => TerminationReason::FailedTransport,
            "failed-application" => TerminationReason::FailedApplication,
            "general-error" => TerminationReason::GeneralError,
            other => TerminationReason::Other(other.to_string()),
        }
    }

    /// Element name used on the wire
    pub fn as_wire(&self) -> &str {
        match self {
            TerminationReason::Success => "success",
            TerminationReason::Decline => "decline",
            TerminationReason::Busy => "busy",
            TerminationReason::Cancel => "cancel",
            TerminationReason::SecurityError => "security-error",
            TerminationReason::Timeout => "timeout",
            TerminationReason::ConnectivityError => "connectivity-error",
            TerminationReason::FailedTransport => "failed-transport",
            TerminationReason::FailedApplication => "failed-application",
            TerminationReason::GeneralError => "general-error",
            TerminationReason::Other(name) => name,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
