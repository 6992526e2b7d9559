//! Per-account provider wiring
//!
//! One [`JingleProvider`] exists per XMPP account. It owns the account's
//! relay pool and its discovery task, the relay harvester, the socket
//! demultiplexer, the session registry and the security error cooldown, so
//! two accounts never share any of them.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use jingle_ice_core::constants::DEMUX_CHANNEL_CAPACITY;
use jingle_ice_core::relay::{DiscoveryReport, PresenceSource};
use jingle_ice_core::{
    DemuxEvent, IceComponent, RelayCandidate, RelayHarvester, RelayNodeService,
    RelayServiceDiscovery, RelaySignaling, SocketDemux,
};
use jingle_infra_common::EntityAddress;
use jingle_session_core::{
    ContactResolver, FileTransferService, JingleSignaling, SecurityErrorCooldown, SessionId,
    SessionRegistry, SignalingEvent,
};

use crate::config::ProviderConfig;

/// External services the provider talks through
#[derive(Clone)]
pub struct Collaborators {
    /// Relay and tracker queries over the XMPP connection
    pub relay_signaling: Arc<dyn RelaySignaling>,
    /// Jingle session signaling over the XMPP connection
    pub jingle_signaling: Arc<dyn JingleSignaling>,
    /// The host application's contact list
    pub contacts: Arc<dyn ContactResolver>,
    /// Online contacts, searched when `relay.search_buddies` is set
    pub presences: Option<Arc<dyn PresenceSource>>,
}

/// Jingle services of one account
pub struct JingleProvider {
    account: EntityAddress,
    config: ProviderConfig,
    nodes: Arc<RelayNodeService>,
    discovery: Arc<RelayServiceDiscovery>,
    harvester: Arc<RelayHarvester>,
    demux: Arc<SocketDemux>,
    demux_events: Mutex<Option<mpsc::Receiver<DemuxEvent>>>,
    registry: SessionRegistry,
    transfers: Arc<FileTransferService>,
}

impl JingleProvider {
    /// Wire up the services for `account`
    ///
    /// The relay pool is seeded with the configured trusted nodes. Nothing
    /// touches the network until [`start_discovery`](Self::start_discovery)
    /// or a harvest.
    pub fn new(account: EntityAddress, config: ProviderConfig, collaborators: Collaborators) -> Self {
        let nodes = Arc::new(RelayNodeService::with_trusted_nodes(&config.relay.trusted_nodes));

        let mut discovery = RelayServiceDiscovery::new(
            nodes.clone(),
            collaborators.relay_signaling.clone(),
            config.relay.clone(),
        );
        if let Some(presences) = collaborators.presences {
            discovery = discovery.with_presences(presences);
        }

        let (demux, demux_events) = SocketDemux::new(DEMUX_CHANNEL_CAPACITY);
        let demux = Arc::new(demux);
        let harvester = RelayHarvester::new(
            nodes.clone(),
            collaborators.relay_signaling,
            config.relay.clone(),
        )
        .with_demux(demux.clone());

        let registry = SessionRegistry::new();
        let cooldown = Arc::new(SecurityErrorCooldown::new(config.transfer.security_error_cooldown));
        let transfers = FileTransferService::new(
            registry.clone(),
            collaborators.jingle_signaling,
            collaborators.contacts,
            cooldown,
            config.transfer.clone(),
        );

        debug!(
            "Jingle provider for {} ({} trusted relay nodes)",
            account,
            nodes.len()
        );

        Self {
            account,
            config,
            nodes,
            discovery: Arc::new(discovery),
            harvester: Arc::new(harvester),
            demux,
            demux_events: Mutex::new(Some(demux_events)),
            registry,
            transfers: Arc::new(transfers),
        }
    }

    /// Account this provider serves
    pub fn account(&self) -> &EntityAddress {
        &self.account
    }

    /// Settings the provider was built with
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Start a relay discovery run in the background
    ///
    /// Called once the account is connected. Harvests wait for the run to
    /// finish before reading the relay pool.
    pub fn start_discovery(&self) -> JoinHandle<DiscoveryReport> {
        info!("Starting Jingle Nodes discovery for {}", self.account);
        self.discovery.clone().spawn()
    }

    /// Relay discovery of this account
    pub fn discovery(&self) -> &Arc<RelayServiceDiscovery> {
        &self.discovery
    }

    /// Relay pool of this account
    pub fn relay_nodes(&self) -> &Arc<RelayNodeService> {
        &self.nodes
    }

    /// The relay harvester, once any running discovery has finished
    ///
    /// `None` when relaying is disabled.
    pub async fn relay_harvester(&self) -> Option<Arc<RelayHarvester>> {
        if !self.config.relay.enabled {
            return None;
        }
        self.discovery.wait_idle().await;
        Some(self.harvester.clone())
    }

    /// Harvest relayed candidates for `component` on a worker task
    pub fn gather_relay_candidates(
        &self,
        component: Arc<IceComponent>,
    ) -> JoinHandle<Vec<Arc<RelayCandidate>>> {
        let enabled = self.config.relay.enabled;
        let discovery = self.discovery.clone();
        let harvester = self.harvester.clone();
        tokio::spawn(async move {
            if !enabled {
                return Vec::new();
            }
            discovery.wait_idle().await;
            let candidates = harvester.harvest(&component).await;
            debug!("Gathered {} relayed candidates for {}", candidates.len(), component);
            candidates
        })
    }

    /// Demultiplexer the harvested relay sockets are registered with
    pub fn demux(&self) -> &Arc<SocketDemux> {
        &self.demux
    }

    /// Take the STUN and media event stream of the relay sockets
    ///
    /// Returns `None` after the first call.
    pub fn take_demux_events(&self) -> Option<mpsc::Receiver<DemuxEvent>> {
        self.demux_events.lock().take()
    }

    /// Sessions of this account
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// File transfer operations of this account
    pub fn file_transfers(&self) -> &Arc<FileTransferService> {
        &self.transfers
    }

    /// Route signaling callbacks from `events` to their sessions
    pub fn attach_signaling(
        &self,
        events: mpsc::Receiver<(SessionId, SignalingEvent)>,
    ) -> JoinHandle<()> {
        self.registry.spawn_dispatcher(events)
    }
}

impl std::fmt::Debug for JingleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JingleProvider")
            .field("account", &self.account)
            .field("relay_nodes", &self.nodes.len())
            .field("sessions", &self.registry.len())
            .finish()
    }
}
