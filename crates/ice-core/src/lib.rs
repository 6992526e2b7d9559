//! ICE candidate model and Jingle Nodes relay harvesting.
//!
//! This crate provides the pieces of ICE (RFC 8445) the Jingle provider needs
//! to reach peers behind NAT: the candidate and component model, a minimal
//! STUN codec for telling connectivity checks apart from media, a socket
//! demultiplexer, and the [`relay`] module that discovers Jingle Nodes relays
//! and harvests relayed candidates from them.

// Error handling
pub mod error;

// Core STUN framing
pub mod stun;

// ICE candidates and components
pub mod candidate;
pub mod component;

// Shared socket registry
pub mod demux;

// Configuration
pub mod config;

// Jingle Nodes relays
pub mod relay;

// Public exports
pub use candidate::{CandidateType, IceCandidate, TransportType};
pub use component::{IceComponent, RTCP_COMPONENT_ID, RTP_COMPONENT_ID};
pub use config::{RelayConfig, TrustedNode};
pub use demux::{DemuxEvent, SocketDemux};
pub use error::{Error, Result};
pub use relay::{
    RelayCandidate, RelayCandidateSocket, RelayHarvester, RelayNodeService,
    RelayServiceDiscovery, RelaySignaling, TrackerEntry,
};
pub use stun::{StunMessage, StunMessageType};

/// Re-export of common types and functions
pub mod prelude {
    pub use super::relay::{
        DiscoveryReport, MappedNodes, NodeKind, NodePolicy, PresenceSource, RelayChannel,
        SearchFlow,
    };
    pub use super::{
        CandidateType, Error, IceCandidate, IceComponent, RelayCandidate, RelayConfig,
        RelayHarvester, RelayNodeService, RelayServiceDiscovery, RelaySignaling, Result,
        SocketDemux, TrackerEntry, TransportType, TrustedNode,
    };
}

/// ICE protocol constants
pub mod constants {
    /// STUN magic cookie value (RFC 5389)
    pub const STUN_MAGIC_COOKIE: u32 = 0x2112A442;

    /// Capacity of the demultiplexer event channel
    pub const DEMUX_CHANNEL_CAPACITY: usize = 256;
}
