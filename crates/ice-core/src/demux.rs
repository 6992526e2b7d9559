//! Shared socket demultiplexer
//!
//! Relayed sockets are registered here once harvested. A reader task per
//! socket splits inbound traffic into STUN connectivity checks and media and
//! forwards both on a single channel owned by the ICE layer.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::relay::RelayCandidateSocket;
use crate::stun::{is_stun_packet, StunMessage};

/// Largest datagram read from a registered socket
const MAX_DATAGRAM: usize = 1500;

/// Inbound traffic from a registered socket
#[derive(Debug, Clone)]
pub enum DemuxEvent {
    /// A STUN message, usually a connectivity check
    Stun {
        /// Socket the message arrived on
        local: SocketAddr,
        /// Sender
        remote: SocketAddr,
        /// Decoded message
        message: StunMessage,
    },
    /// Anything that is not STUN
    Media {
        /// Socket the datagram arrived on
        local: SocketAddr,
        /// Sender
        remote: SocketAddr,
        /// Datagram payload
        data: Bytes,
    },
}

impl DemuxEvent {
    /// Local address the traffic arrived on
    pub fn local(&self) -> SocketAddr {
        match self {
            DemuxEvent::Stun { local, .. } | DemuxEvent::Media { local, .. } => *local,
        }
    }
}

/// Registry of relayed sockets keyed by local address
pub struct SocketDemux {
    readers: Mutex<HashMap<SocketAddr, JoinHandle<()>>>,
    events: mpsc::Sender<DemuxEvent>,
}

impl SocketDemux {
    /// Create a demultiplexer and the receiving end of its event channel
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DemuxEvent>) {
        let (events, rx) = mpsc::channel(capacity);
        (
            Self {
                readers: Mutex::new(HashMap::new()),
                events,
            },
            rx,
        )
    }

    /// Register a socket and start reading from it
    ///
    /// Fails if a socket with the same local address is already registered.
    pub fn register(&self, socket: Arc<RelayCandidateSocket>) -> Result<()> {
        let local = socket.local_addr();
        let mut readers = self.readers.lock();
        prune_finished(&mut readers);
        if readers.contains_key(&local) {
            return Err(Error::AlreadyRegistered(local));
        }

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                let (len, remote) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(e) => {
                        debug!("Relay socket {} stopped reading: {}", local, e);
                        break;
                    }
                };
                let event = classify(local, remote, &buf[..len]);
                if events.send(event).await.is_err() {
                    trace!("Demux receiver dropped, stopping reader for {}", local);
                    break;
                }
            }
        });

        readers.insert(local, handle);
        debug!("Registered relay socket {}", local);
        Ok(())
    }

    /// Stop reading from a socket; returns whether it was registered
    pub fn unregister(&self, local: SocketAddr) -> bool {
        match self.readers.lock().remove(&local) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a socket is registered for `local` and still being read
    pub fn is_registered(&self, local: SocketAddr) -> bool {
        let mut readers = self.readers.lock();
        prune_finished(&mut readers);
        readers.contains_key(&local)
    }

    /// Number of sockets still being read
    pub fn len(&self) -> usize {
        let mut readers = self.readers.lock();
        prune_finished(&mut readers);
        readers.len()
    }

    /// Whether no socket is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SocketDemux {
    fn drop(&mut self) {
        for (_, handle) in self.readers.lock().drain() {
            handle.abort();
        }
    }
}

/// Forget readers that stopped on a socket error or a closed channel
fn prune_finished(readers: &mut HashMap<SocketAddr, JoinHandle<()>>) {
    readers.retain(|local, handle| {
        let running = !handle.is_finished();
        if !running {
            trace!("Reader for {} has stopped", local);
        }
        running
    });
}

/// Split a datagram into STUN or media
pub fn classify(local: SocketAddr, remote: SocketAddr, datagram: &[u8]) -> DemuxEvent {
    if is_stun_packet(datagram) {
        match StunMessage::decode(datagram) {
            Ok(message) => return DemuxEvent::Stun { local, remote, message },
            Err(e) => trace!("Failed to parse as STUN: {}", e),
        }
    }
    DemuxEvent::Media {
        local,
        remote,
        data: Bytes::copy_from_slice(datagram),
    }
}
