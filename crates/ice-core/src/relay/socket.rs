//! Datagram socket of a relayed candidate
//!
//! Everything sent on the socket goes to the relay's local endpoint, which
//! forwards it to the peer; the caller's destination is ignored. Inbound
//! media is run through [`RelayLossCounter`].

use std::net::SocketAddr;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::error::Result;
use crate::relay::loss::{LossConfig, LossStats, RelayLossCounter};
use crate::stun::is_stun_packet;

/// UDP socket bound for one relayed candidate
#[derive(Debug)]
pub struct RelayCandidateSocket {
    socket: UdpSocket,
    local_addr: SocketAddr,
    relay_endpoint: SocketAddr,
    loss: Mutex<RelayLossCounter>,
}

impl RelayCandidateSocket {
    /// Bind a socket on `bind_addr` that relays through `relay_endpoint`
    pub async fn bind(
        bind_addr: SocketAddr,
        relay_endpoint: SocketAddr,
        loss_config: LossConfig,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        let local_addr = socket.local_addr()?;
        debug!("Bound relay socket {} -> {}", local_addr, relay_endpoint);

        Ok(Self {
            socket,
            local_addr,
            relay_endpoint,
            loss: Mutex::new(RelayLossCounter::new(loss_config)),
        })
    }

    /// Locally bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Relay endpoint every datagram is sent to
    pub fn relay_endpoint(&self) -> SocketAddr {
        self.relay_endpoint
    }

    /// Send a datagram addressed to `dest`; it travels via the relay
    pub async fn send_to(&self, data: &[u8], dest: SocketAddr) -> Result<usize> {
        if dest != self.relay_endpoint {
            trace!("Redirecting datagram for {} to relay {}", dest, self.relay_endpoint);
        }
        self.send(data).await
    }

    /// Send a datagram to the relay
    pub async fn send(&self, data: &[u8]) -> Result<usize> {
        let sent = self.socket.send_to(data, self.relay_endpoint).await?;
        self.loss.lock().record_sent();
        Ok(sent)
    }

    /// Receive a datagram, updating loss accounting for media
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let (len, from) = self.socket.recv_from(buf).await?;
        if !is_stun_packet(&buf[..len]) {
            self.loss.lock().record_received(&buf[..len], Instant::now());
        }
        Ok((len, from))
    }

    /// Current loss counters
    pub fn loss_stats(&self) -> LossStats {
        self.loss.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stun::StunMessage;

    fn rtp(seq: u16) -> Vec<u8> {
        let mut packet = vec![0x80, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        packet[2..4].copy_from_slice(&seq.to_be_bytes());
        packet
    }

    #[tokio::test]
    async fn send_goes_to_relay_endpoint() {
        let relay = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let relay_addr = relay.local_addr().unwrap();
        let socket = RelayCandidateSocket::bind("127.0.0.1:0".parse().unwrap(), relay_addr, LossConfig::default())
            .await
            .unwrap();

        socket.send_to(b"hello", "198.51.100.1:9".parse().unwrap()).await.unwrap();

        let mut buf = [0u8; 32];
        let (len, from) = relay.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hello");
        assert_eq!(from, socket.local_addr());
        assert_eq!(socket.loss_stats().sent, 1);
    }

    #[tokio::test]
    async fn stun_is_excluded_from_loss_accounting() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = RelayCandidateSocket::bind(
            "127.0.0.1:0".parse().unwrap(),
            peer.local_addr().unwrap(),
            LossConfig::default(),
        )
        .await
        .unwrap();
        let target = socket.local_addr();

        peer.send_to(&rtp(10), target).await.unwrap();
        peer.send_to(&StunMessage::binding_request().encode(), target).await.unwrap();
        peer.send_to(&rtp(13), target).await.unwrap();

        let mut buf = [0u8; 128];
        for _ in 0..3 {
            socket.recv_from(&mut buf).await.unwrap();
        }

        let stats = socket.loss_stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.lost, 2);
    }
}
