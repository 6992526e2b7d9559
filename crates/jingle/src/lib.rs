//! # jingle - Jingle session and relay provider
//!
//! Ties the workspace crates together for one XMPP account:
//!
//! - **Relay discovery**: walks the server's service directory and Jingle
//!   Nodes trackers to fill the account's relay pool
//! - **Relay harvesting**: allocates channels on the preferred relay and
//!   hands out relayed ICE candidates
//! - **File transfer**: Jingle file offers with an HTTP upload fallback
//!   after security errors
//!
//! ## Module Structure
//!
//! - [`infra_common`]: addresses, errors, logging and settings
//! - [`ice_core`]: ICE candidates, socket demultiplexing and relays
//! - [`session_core`]: session state machines, registry and file transfer
//! - [`provider`]: per-account wiring of the above
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use jingle::prelude::*;
//! # async fn run(collaborators: Collaborators) -> jingle::Result<()> {
//! let config = ProviderConfig::load(Some("jingle.toml".as_ref()))?;
//! let provider = JingleProvider::new("alice@example.org/desktop".into(), config, collaborators);
//! provider.start_discovery();
//!
//! let component = Arc::new(IceComponent::new("audio", RTP_COMPONENT_ID));
//! let relayed = provider.gather_relay_candidates(component).await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod provider;

// Re-export all crates as modules
pub use jingle_ice_core as ice_core;
pub use jingle_infra_common as infra_common;
pub use jingle_session_core as session_core;

pub use config::ProviderConfig;
pub use error::{Error, Result};
pub use provider::{Collaborators, JingleProvider};

// Re-export commonly used items for convenience
pub mod prelude {
    //! Common imports for Jingle provider applications

    pub use crate::ice_core::relay::{DiscoveryReport, PresenceSource, RelayChannel};
    pub use crate::ice_core::{
        IceCandidate, IceComponent, RelayCandidate, RelayConfig, RelayHarvester,
        RelaySignaling, TrackerEntry, TrustedNode, RTCP_COMPONENT_ID, RTP_COMPONENT_ID,
    };
    pub use crate::infra_common::EntityAddress;
    pub use crate::session_core::{
        CallSession, Contact, ContactResolver, FileMetadata, FileOfferSession,
        FileTransferListener, FileTransferService, IncomingOffer, JingleSignaling,
        SessionError, SessionId, SessionObserver, SessionRegistry, SessionState,
        SessionStatusEvent, SignalingError, SignalingEvent, TerminationReason, TransferConfig,
        TransferRoute,
    };
    pub use crate::{Collaborators, JingleProvider, ProviderConfig};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
