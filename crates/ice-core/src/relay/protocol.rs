//! Signaling collaborators used by relay discovery and harvesting
//!
//! The XMPP connection lives outside this crate. Discovery needs only four
//! round trips from it: a service directory listing, a tracker query, a
//! relay channel allocation, and the set of online contacts.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use jingle_infra_common::EntityAddress;

use crate::error::Result;
use crate::relay::node::TrackerEntry;

/// Ports allocated on a relay for one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayChannel {
    /// Relay host, possibly carrying a `%scope` suffix
    pub host: String,
    /// Port our own traffic is sent to
    pub local_port: u16,
    /// Port advertised to the peer
    pub remote_port: u16,
    /// Transport protocol of the channel
    pub protocol: String,
}

/// Relay signaling over the account's XMPP connection
#[async_trait]
pub trait RelaySignaling: Send + Sync {
    /// Whether the connection is usable
    fn is_connected(&self) -> bool;

    /// Our own full address
    fn local_address(&self) -> EntityAddress;

    /// Domain of the account's server
    fn service_domain(&self) -> EntityAddress;

    /// Host the connection actually talks to, when it differs from the domain
    fn server_host(&self) -> Option<EntityAddress> {
        None
    }

    /// Ask `relay` for a channel
    ///
    /// `Ok(None)` means the relay answered without allocating.
    async fn resolve_channel(
        &self,
        relay: &EntityAddress,
        timeout: Duration,
    ) -> Result<Option<RelayChannel>>;

    /// List the items of a service directory
    async fn discover_items(
        &self,
        service: &EntityAddress,
        timeout: Duration,
    ) -> Result<Vec<EntityAddress>>;

    /// Ask a node for the relays and trackers it knows
    ///
    /// `Ok(None)` means the node is not a tracker.
    async fn query_services(
        &self,
        node: &EntityAddress,
        timeout: Duration,
    ) -> Result<Option<Vec<TrackerEntry>>>;
}

/// Online contacts whose own nodes may be searched
#[async_trait]
pub trait PresenceSource: Send + Sync {
    /// Full addresses of every available contact resource
    async fn available_presences(&self) -> Vec<EntityAddress>;
}
