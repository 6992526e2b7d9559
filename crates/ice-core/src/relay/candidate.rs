//! Relayed candidates allocated on a Jingle Nodes relay

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::candidate::{CandidateType, IceCandidate, TransportType};
use crate::error::Result;
use crate::relay::loss::LossConfig;
use crate::relay::socket::RelayCandidateSocket;

/// A relayed ICE candidate plus its lazily bound socket
///
/// The candidate address is the relay-side address peers send to; the local
/// endpoint is the relay port our own traffic must be sent to.
#[derive(Debug)]
pub struct RelayCandidate {
    candidate: IceCandidate,
    local_endpoint: SocketAddr,
    bind_addr: SocketAddr,
    loss_config: LossConfig,
    socket: OnceCell<Arc<RelayCandidateSocket>>,
}

impl RelayCandidate {
    /// Create a relayed candidate for `component`
    pub fn new(
        component: u16,
        transport_address: SocketAddr,
        local_endpoint: SocketAddr,
        bind_ip: IpAddr,
        loss_config: LossConfig,
    ) -> Self {
        Self {
            candidate: IceCandidate::new(
                CandidateType::Relayed,
                component,
                TransportType::Udp,
                transport_address,
                Some(local_endpoint),
            ),
            local_endpoint,
            bind_addr: SocketAddr::new(bind_ip, 0),
            loss_config,
            socket: OnceCell::new(),
        }
    }

    /// The ICE view of this candidate
    pub fn candidate(&self) -> &IceCandidate {
        &self.candidate
    }

    /// Relay-side transport address advertised to peers
    pub fn transport_address(&self) -> SocketAddr {
        self.candidate.address()
    }

    /// Relay endpoint our traffic is sent to
    pub fn local_endpoint(&self) -> SocketAddr {
        self.local_endpoint
    }

    /// Component id of the candidate
    pub fn component_id(&self) -> u16 {
        self.candidate.component
    }

    /// The candidate's socket, bound on first use
    pub async fn socket(&self) -> Result<Arc<RelayCandidateSocket>> {
        self.socket
            .get_or_try_init(|| async {
                RelayCandidateSocket::bind(self.bind_addr, self.local_endpoint, self.loss_config)
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }

    /// Whether the socket has been bound
    pub fn has_socket(&self) -> bool {
        self.socket.initialized()
    }
}
