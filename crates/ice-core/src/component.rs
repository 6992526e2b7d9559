//! ICE components
//!
//! A component is one transport flow of a media stream (RTP or RTCP). It owns
//! the list of local candidates gathered for it and is the authority on
//! which candidates are redundant.

use std::net::SocketAddr;

use parking_lot::RwLock;
use tracing::trace;

use crate::candidate::{CandidateType, IceCandidate};

/// Component id of the RTP flow
pub const RTP_COMPONENT_ID: u16 = 1;

/// Component id of the RTCP flow
pub const RTCP_COMPONENT_ID: u16 = 2;

/// One component of an ICE media stream
#[derive(Debug)]
pub struct IceComponent {
    stream: String,
    component_id: u16,
    local_candidates: RwLock<Vec<IceCandidate>>,
}

impl IceComponent {
    /// Create an empty component
    pub fn new(stream: impl Into<String>, component_id: u16) -> Self {
        Self {
            stream: stream.into(),
            component_id,
            local_candidates: RwLock::new(Vec::new()),
        }
    }

    /// Component id
    pub fn id(&self) -> u16 {
        self.component_id
    }

    /// Name of the owning media stream
    pub fn stream_name(&self) -> &str {
        &self.stream
    }

    /// Add a local candidate unless an equivalent one is already present
    ///
    /// Two candidates are redundant when they share transport address,
    /// transport and related address. Returns whether the candidate was added.
    pub fn add_local_candidate(&self, candidate: IceCandidate) -> bool {
        let mut candidates = self.local_candidates.write();
        let redundant = candidates.iter().any(|c| {
            c.address() == candidate.address()
                && c.transport == candidate.transport
                && c.related_address == candidate.related_address
        });
        if redundant {
            trace!("Ignoring redundant candidate {} on {}", candidate, self);
            return false;
        }
        candidates.push(candidate);
        true
    }

    /// Snapshot of all local candidates
    pub fn local_candidates(&self) -> Vec<IceCandidate> {
        self.local_candidates.read().clone()
    }

    /// Snapshot of the host candidates
    pub fn host_candidates(&self) -> Vec<IceCandidate> {
        self.local_candidates
            .read()
            .iter()
            .filter(|c| c.candidate_type == CandidateType::Host)
            .cloned()
            .collect()
    }

    /// Address of the first host candidate of the same IP family as `target`
    pub fn host_address_for(&self, target: SocketAddr) -> Option<SocketAddr> {
        self.local_candidates
            .read()
            .iter()
            .filter(|c| c.candidate_type == CandidateType::Host)
            .map(|c| c.address())
            .find(|addr| addr.is_ipv4() == target.is_ipv4())
    }

    /// Number of local candidates
    pub fn candidate_count(&self) -> usize {
        self.local_candidates.read().len()
    }
}

impl std::fmt::Display for IceComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.stream, self.component_id)
    }
}
