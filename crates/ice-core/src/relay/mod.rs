//! Jingle Nodes relays
//!
//! Discovery fills a per-account [`RelayNodeService`] with relays and
//! trackers; the [`RelayHarvester`] allocates channels on the preferred relay
//! and turns them into [`RelayCandidate`]s whose sockets account RTP loss.

pub mod candidate;
pub mod discovery;
pub mod harvester;
pub mod loss;
pub mod node;
pub mod protocol;
pub mod socket;

pub use candidate::RelayCandidate;
pub use discovery::{DiscoveryReport, RelayServiceDiscovery, SearchFlow};
pub use harvester::{HarvestStats, RelayHarvester};
pub use loss::{lost_between, LossConfig, LossStats, RelayLossCounter};
pub use node::{MappedNodes, NodeKind, NodePolicy, RelayNodeService, TrackerEntry};
pub use protocol::{PresenceSource, RelayChannel, RelaySignaling};
pub use socket::RelayCandidateSocket;
