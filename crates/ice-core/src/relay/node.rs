//! Pool of known Jingle Nodes relays and trackers

use std::fmt;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use jingle_infra_common::EntityAddress;

use crate::config::TrustedNode;

/// What a node offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Knows other nodes
    Tracker,
    /// Relays media
    Relay,
}

/// Who may use a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodePolicy {
    /// Anyone
    Public,
    /// Only the owner's roster
    Roster,
}

/// A relay or tracker learned from configuration or discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerEntry {
    /// Service address
    pub address: EntityAddress,
    /// Relay or tracker
    pub kind: NodeKind,
    /// Access policy
    pub policy: NodePolicy,
    /// Supported transport protocol
    pub protocol: String,
    /// Found through a prefix-matched directory item
    #[serde(default)]
    pub preferred: bool,
}

impl TrackerEntry {
    /// A public UDP relay
    pub fn relay(address: impl Into<EntityAddress>) -> Self {
        Self::public(address.into(), NodeKind::Relay)
    }

    /// A public UDP tracker
    pub fn tracker(address: impl Into<EntityAddress>) -> Self {
        Self::public(address.into(), NodeKind::Tracker)
    }

    fn public(address: EntityAddress, kind: NodeKind) -> Self {
        Self {
            address,
            kind,
            policy: NodePolicy::Public,
            protocol: "udp".to_string(),
            preferred: false,
        }
    }

    /// Whether this entry relays media
    pub fn is_relay(&self) -> bool {
        self.kind == NodeKind::Relay
    }
}

impl From<&TrustedNode> for TrackerEntry {
    fn from(node: &TrustedNode) -> Self {
        if node.relay {
            TrackerEntry::relay(node.address.clone())
        } else {
            TrackerEntry::tracker(node.address.clone())
        }
    }
}

impl fmt::Display for TrackerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            NodeKind::Relay => "relay",
            NodeKind::Tracker => "tracker",
        };
        write!(f, "{} ({}/{})", self.address, kind, self.protocol)
    }
}

/// Relays and trackers collected by one discovery run
#[derive(Debug, Default, Clone)]
pub struct MappedNodes {
    relays: IndexMap<EntityAddress, TrackerEntry>,
    trackers: IndexMap<EntityAddress, TrackerEntry>,
}

impl MappedNodes {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a relay; the first sighting wins
    pub fn add_relay(&mut self, entry: TrackerEntry) {
        self.relays.entry(entry.address.clone()).or_insert(entry);
    }

    /// Record a tracker; the first sighting wins
    pub fn add_tracker(&mut self, entry: TrackerEntry) {
        self.trackers.entry(entry.address.clone()).or_insert(entry);
    }

    /// Relays in discovery order
    pub fn relays(&self) -> impl Iterator<Item = &TrackerEntry> {
        self.relays.values()
    }

    /// Trackers in discovery order
    pub fn trackers(&self) -> impl Iterator<Item = &TrackerEntry> {
        self.trackers.values()
    }

    /// Number of relays
    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }

    /// Number of trackers
    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }
}

/// Account-wide pool of known nodes
#[derive(Debug, Default)]
pub struct RelayNodeService {
    entries: RwLock<IndexMap<EntityAddress, TrackerEntry>>,
}

impl RelayNodeService {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool seeded with statically configured nodes
    pub fn with_trusted_nodes(nodes: &[TrustedNode]) -> Self {
        let service = Self::new();
        for node in nodes {
            service.add_entry(TrackerEntry::from(node));
        }
        service
    }

    /// Add or refresh an entry, keeping its position
    pub fn add_entry(&self, entry: TrackerEntry) {
        let mut entries = self.entries.write();
        match entries.get_mut(&entry.address) {
            Some(existing) => {
                let preferred = existing.preferred || entry.preferred;
                *existing = TrackerEntry { preferred, ..entry };
            }
            None => {
                entries.insert(entry.address.clone(), entry);
            }
        }
    }

    /// Merge a discovery result, relays first
    pub fn add_entries(&self, nodes: &MappedNodes) {
        for relay in nodes.relays() {
            self.add_entry(relay.clone());
        }
        for tracker in nodes.trackers() {
            self.add_entry(tracker.clone());
        }
        debug!(
            "Node pool now holds {} entries ({} relays, {} trackers merged)",
            self.len(),
            nodes.relay_count(),
            nodes.tracker_count()
        );
    }

    /// Relay to allocate channels on
    ///
    /// The first preferred relay, otherwise the first relay in pool order.
    pub fn preferred_relay(&self) -> Option<TrackerEntry> {
        let entries = self.entries.read();
        entries
            .values()
            .find(|e| e.is_relay() && e.preferred)
            .or_else(|| entries.values().find(|e| e.is_relay()))
            .cloned()
    }

    /// Snapshot of every entry in pool order
    pub fn entries(&self) -> Vec<TrackerEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// Entries that may be shared with other parties
    pub fn known_nodes(&self) -> Vec<TrackerEntry> {
        self.entries
            .read()
            .values()
            .filter(|e| e.policy != NodePolicy::Roster)
            .cloned()
            .collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
