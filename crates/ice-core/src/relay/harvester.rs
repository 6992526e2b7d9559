//! Relayed candidate harvesting
//!
//! One channel allocation yields two candidates: the RTP one returned right
//! away and an RTCP one on the next port pair, parked until the next call.
//! Harvesting never fails; every problem is logged and produces an empty set.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::candidate::parse_ip_literal;
use crate::component::IceComponent;
use crate::config::RelayConfig;
use crate::demux::SocketDemux;
use crate::error::{Error, Result};
use crate::relay::candidate::RelayCandidate;
use crate::relay::node::RelayNodeService;
use crate::relay::protocol::{RelayChannel, RelaySignaling};

/// Addresses of an allocated but not yet handed out candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAllocation {
    transport_address: SocketAddr,
    local_endpoint: SocketAddr,
}

/// Harvest counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Calls to [`RelayHarvester::harvest`]
    pub harvests: u64,
    /// Candidates handed out
    pub candidates: u64,
    /// Time spent harvesting
    pub total_time: Duration,
}

/// Produces relayed candidates from the account's preferred relay
pub struct RelayHarvester {
    service: Arc<RelayNodeService>,
    signaling: Arc<dyn RelaySignaling>,
    demux: Option<Arc<SocketDemux>>,
    config: RelayConfig,
    pending_rtcp: Mutex<Option<PendingAllocation>>,
    stats: Mutex<HarvestStats>,
}

impl RelayHarvester {
    /// Create a harvester allocating on relays from `service`
    pub fn new(
        service: Arc<RelayNodeService>,
        signaling: Arc<dyn RelaySignaling>,
        config: RelayConfig,
    ) -> Self {
        Self {
            service,
            signaling,
            demux: None,
            config,
            pending_rtcp: Mutex::new(None),
            stats: Mutex::new(HarvestStats::default()),
        }
    }

    /// Register harvested sockets with a shared demultiplexer
    pub fn with_demux(mut self, demux: Arc<SocketDemux>) -> Self {
        self.demux = Some(demux);
        self
    }

    /// Gather relayed candidates for `component`
    ///
    /// Returns at most one candidate. A parked RTCP allocation from the
    /// previous call is used before asking the relay for a new channel.
    pub async fn harvest(&self, component: &IceComponent) -> Vec<Arc<RelayCandidate>> {
        let started = Instant::now();
        let candidates = self.harvest_inner(component).await;

        let mut stats = self.stats.lock();
        stats.harvests += 1;
        stats.candidates += candidates.len() as u64;
        stats.total_time += started.elapsed();
        candidates
    }

    /// Harvest counters so far
    pub fn stats(&self) -> HarvestStats {
        *self.stats.lock()
    }

    /// Whether an RTCP allocation is waiting for the next call
    pub fn has_pending_rtcp(&self) -> bool {
        self.pending_rtcp.lock().is_some()
    }

    async fn harvest_inner(&self, component: &IceComponent) -> Vec<Arc<RelayCandidate>> {
        if !self.config.enabled {
            return Vec::new();
        }

        let pending = self.pending_rtcp.lock().take();
        let allocation = match pending {
            Some(rtcp) => {
                debug!("Using parked RTCP relay allocation for {}", component);
                rtcp
            }
            None => match self.allocate().await {
                Ok(Some((rtp, rtcp))) => {
                    *self.pending_rtcp.lock() = rtcp;
                    rtp
                }
                Ok(None) => return Vec::new(),
                Err(e) => {
                    debug!("Relay allocation for {} failed: {}", component, e);
                    return Vec::new();
                }
            },
        };

        match self.create_candidate(component, allocation).await {
            Ok(Some(candidate)) => vec![candidate],
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!("Failed to create relay candidate for {}: {}", component, e);
                Vec::new()
            }
        }
    }

    /// Allocate a channel on the preferred relay
    async fn allocate(&self) -> Result<Option<(PendingAllocation, Option<PendingAllocation>)>> {
        let Some(relay) = self.service.preferred_relay() else {
            debug!("No Jingle Nodes relay known");
            return Ok(None);
        };

        let timeout = self.config.allocation_timeout();
        let channel = tokio::time::timeout(timeout, self.signaling.resolve_channel(&relay.address, timeout))
            .await
            .map_err(|_| Error::Timeout(relay.address.to_string()))??;
        let Some(channel) = channel else {
            debug!("Relay {} did not allocate a channel", relay.address);
            return Ok(None);
        };

        let (rtp, rtcp) = allocation_from_channel(&channel)?;
        info!(
            "Allocated relay channel on {}: {} via {}",
            relay.address, rtp.transport_address, rtp.local_endpoint
        );
        Ok(Some((rtp, rtcp)))
    }

    async fn create_candidate(
        &self,
        component: &IceComponent,
        allocation: PendingAllocation,
    ) -> Result<Option<Arc<RelayCandidate>>> {
        let bind_ip = component
            .host_address_for(allocation.local_endpoint)
            .map(|addr| addr.ip())
            .unwrap_or_else(|| unspecified_like(allocation.local_endpoint.ip()));

        let candidate = Arc::new(RelayCandidate::new(
            component.id(),
            allocation.transport_address,
            allocation.local_endpoint,
            bind_ip,
            self.config.loss_config(),
        ));
        let socket = candidate.socket().await?;

        // A rejected candidate drops its socket with it
        if !component.add_local_candidate(candidate.candidate().clone()) {
            debug!("{} already has relayed candidate {}", component, allocation.transport_address);
            return Ok(None);
        }

        if let Some(demux) = &self.demux {
            if let Err(e) = demux.register(socket) {
                debug!("Relay socket registration failed: {}", e);
            }
        }
        Ok(Some(candidate))
    }
}

/// RTP and RTCP addresses for an allocated channel
///
/// The relayed candidate takes the remote port, our traffic goes to the local
/// port, and RTCP uses the next port of each.
fn allocation_from_channel(
    channel: &RelayChannel,
) -> Result<(PendingAllocation, Option<PendingAllocation>)> {
    if channel.host.trim().is_empty() || channel.local_port == 0 || channel.remote_port == 0 {
        return Err(Error::InvalidAddress(format!(
            "{}:{}/{}",
            channel.host, channel.local_port, channel.remote_port
        )));
    }
    let ip = parse_ip_literal(channel.host.trim())?;

    let rtp = PendingAllocation {
        transport_address: SocketAddr::new(ip, channel.remote_port),
        local_endpoint: SocketAddr::new(ip, channel.local_port),
    };
    let rtcp = match (channel.remote_port.checked_add(1), channel.local_port.checked_add(1)) {
        (Some(remote), Some(local)) => Some(PendingAllocation {
            transport_address: SocketAddr::new(ip, remote),
            local_endpoint: SocketAddr::new(ip, local),
        }),
        _ => None,
    };
    Ok((rtp, rtcp))
}

fn unspecified_like(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}
