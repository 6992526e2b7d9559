//! Jingle session management.
//!
//! This crate implements the session side of the Jingle provider: the
//! state machine shared by file offers and calls, the registry correlating
//! signaling callbacks with sessions, the per-provider security error
//! cooldown and the file transfer service built on top of them. The XMPP
//! connection itself is reached through the [`signaling::JingleSignaling`]
//! trait.
//!
//! ```text
//! signaling layer --SignalingEvent--> SessionRegistry --> FileOfferSession / CallSession
//!        ^                                                        |
//!        +-------------- accept / decline / cancel ---------------+
//! ```

pub mod config;
pub mod contact;
pub mod cooldown;
pub mod errors;
pub mod events;
pub mod registry;
pub mod session;
pub mod signaling;
pub mod state;
pub mod transfer;
pub mod types;

pub use config::TransferConfig;
pub use contact::{Contact, ContactResolver, NoContacts};
pub use cooldown::SecurityErrorCooldown;
pub use errors::{Result, SessionError, SignalingError};
pub use events::{ObserverHandle, ObserverSet, ProgressEvent, SessionObserver, SessionStatusEvent};
pub use registry::{RegistrationHandle, RegistryStats, SessionRegistry};
pub use session::{CallSession, FileOfferSession, JingleSession, SessionCore, SessionHandle};
pub use signaling::{JingleSignaling, SignalingEvent, SignalingResult};
pub use state::{SessionState, TerminationReason};
pub use transfer::{FileTransferListener, FileTransferService, IncomingOffer, TransferRoute};
pub use types::{Direction, FileMetadata, SessionId};

/// Re-export of common types and functions
pub mod prelude {
    pub use super::{
        CallSession, Contact, ContactResolver, Direction, FileMetadata, FileOfferSession,
        FileTransferListener, FileTransferService, IncomingOffer, JingleSession, JingleSignaling,
        Result, SecurityErrorCooldown, SessionError, SessionHandle, SessionId, SessionObserver,
        SessionRegistry, SessionState, SessionStatusEvent, SignalingError, SignalingEvent,
        TerminationReason, TransferConfig, TransferRoute,
    };
}
