//! ICE candidates
//!
//! Candidates are plain values: the socket behind a relayed candidate is
//! owned by [`crate::relay::RelayCandidate`], not by the candidate itself.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

use crate::error::{Error, Result};

/// Transport protocol of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// UDP
    Udp,
    /// TCP (passive or active is irrelevant for relayed candidates)
    Tcp,
}

impl TransportType {
    /// Whether this is a TCP transport
    pub fn is_tcp(self) -> bool {
        matches!(self, TransportType::Tcp)
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Udp => write!(f, "UDP"),
            TransportType::Tcp => write!(f, "TCP"),
        }
    }
}

/// Type of an ICE candidate (RFC 8445 section 5.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateType {
    /// Address of a local interface
    Host,
    /// Address seen by a STUN server
    ServerReflexive,
    /// Address learned from connectivity checks
    PeerReflexive,
    /// Address allocated on a relay
    Relayed,
}

impl CandidateType {
    /// Recommended type preference (RFC 8445 section 5.1.2.2)
    pub fn type_preference(self) -> u32 {
        match self {
            CandidateType::Host => 126,
            CandidateType::PeerReflexive => 110,
            CandidateType::ServerReflexive => 100,
            CandidateType::Relayed => 0,
        }
    }

    /// SDP `typ` token
    pub fn as_sdp(self) -> &'static str {
        match self {
            CandidateType::Host => "host",
            CandidateType::ServerReflexive => "srflx",
            CandidateType::PeerReflexive => "prflx",
            CandidateType::Relayed => "relay",
        }
    }

    fn from_sdp(token: &str) -> Option<Self> {
        match token {
            "host" => Some(CandidateType::Host),
            "srflx" => Some(CandidateType::ServerReflexive),
            "prflx" => Some(CandidateType::PeerReflexive),
            "relay" => Some(CandidateType::Relayed),
            _ => None,
        }
    }
}

/// A local or remote ICE candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    /// Foundation, equal for candidates of the same type and base
    pub foundation: String,
    /// Component id (1 = RTP, 2 = RTCP)
    pub component: u16,
    /// Transport protocol
    pub transport: TransportType,
    /// Candidate priority
    pub priority: u32,
    /// Transport address
    pub ip: IpAddr,
    /// Transport port
    pub port: u16,
    /// Candidate type
    pub candidate_type: CandidateType,
    /// Related address: the base for reflexive candidates, the relay
    /// server endpoint for relayed ones
    pub related_address: Option<SocketAddr>,
}

impl IceCandidate {
    /// Create a candidate, deriving foundation and priority
    pub fn new(
        candidate_type: CandidateType,
        component: u16,
        transport: TransportType,
        address: SocketAddr,
        related_address: Option<SocketAddr>,
    ) -> Self {
        let base_ip = related_address.map(|r| r.ip()).unwrap_or(address.ip());
        Self {
            foundation: compute_foundation(candidate_type, base_ip, transport),
            component,
            transport,
            priority: compute_priority(candidate_type, 65535, component),
            ip: address.ip(),
            port: address.port(),
            candidate_type,
            related_address,
        }
    }

    /// The candidate's transport address
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Render as an SDP `a=candidate` value
    pub fn to_sdp_string(&self) -> String {
        let mut sdp = format!(
            "candidate:{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.transport,
            self.priority,
            self.ip,
            self.port,
            self.candidate_type.as_sdp()
        );
        if let Some(related) = self.related_address {
            sdp.push_str(&format!(" raddr {} rport {}", related.ip(), related.port()));
        }
        sdp
    }

    /// Parse an SDP `a=candidate` value
    pub fn from_sdp_string(sdp: &str) -> Result<Self> {
        let sdp = sdp.trim().trim_start_matches("a=");
        let fields: Vec<&str> = sdp.split_whitespace().collect();
        if fields.len() < 8 || fields[6] != "typ" {
            return Err(Error::IceError(format!("Malformed candidate: {}", sdp)));
        }

        let foundation = fields[0]
            .strip_prefix("candidate:")
            .ok_or_else(|| Error::IceError(format!("Missing candidate prefix: {}", sdp)))?
            .to_string();
        let component = fields[1]
            .parse()
            .map_err(|_| Error::IceError(format!("Bad component: {}", fields[1])))?;
        let transport = match fields[2].to_ascii_uppercase().as_str() {
            "UDP" => TransportType::Udp,
            "TCP" => TransportType::Tcp,
            other => return Err(Error::IceError(format!("Bad transport: {}", other))),
        };
        let priority = fields[3]
            .parse()
            .map_err(|_| Error::IceError(format!("Bad priority: {}", fields[3])))?;
        let ip: IpAddr = parse_ip_literal(fields[4])?;
        let port = fields[5]
            .parse()
            .map_err(|_| Error::IceError(format!("Bad port: {}", fields[5])))?;
        let candidate_type = CandidateType::from_sdp(fields[7])
            .ok_or_else(|| Error::IceError(format!("Bad candidate type: {}", fields[7])))?;

        let mut related_address = None;
        if let (Some(raddr), Some(rport)) = (
            field_after(&fields, "raddr"),
            field_after(&fields, "rport"),
        ) {
            let ip = parse_ip_literal(raddr)?;
            let port = rport
                .parse()
                .map_err(|_| Error::IceError(format!("Bad rport: {}", rport)))?;
            related_address = Some(SocketAddr::new(ip, port));
        }

        Ok(Self {
            foundation,
            component,
            transport,
            priority,
            ip,
            port,
            candidate_type,
            related_address,
        })
    }
}

impl fmt::Display for IceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({} component {})",
            self.address(),
            self.transport,
            self.candidate_type.as_sdp(),
            self.component
        )
    }
}

/// Candidate priority (RFC 8445 section 5.1.2.1)
pub fn compute_priority(candidate_type: CandidateType, local_preference: u16, component: u16) -> u32 {
    (candidate_type.type_preference() << 24)
        + ((local_preference as u32) << 8)
        + (256 - component.min(256) as u32)
}

fn compute_foundation(candidate_type: CandidateType, base: IpAddr, transport: TransportType) -> String {
    let mut hasher = DefaultHasher::new();
    candidate_type.hash(&mut hasher);
    base.hash(&mut hasher);
    transport.hash(&mut hasher);
    (hasher.finish() as u32).to_string()
}

/// Parse an IP literal, dropping any `%scope` suffix
///
/// Zone identifiers only make sense on the interface that owns them, so an
/// address received from a remote relay is always treated as scope-less.
pub fn parse_ip_literal(literal: &str) -> Result<IpAddr> {
    let bare = strip_scope_id(literal);
    bare.trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| Error::InvalidAddress(literal.to_string()))
}

/// Remove a `%scope` suffix from an address literal
pub fn strip_scope_id(literal: &str) -> &str {
    match literal.find('%') {
        Some(idx) => &literal[..idx],
        None => literal,
    }
}

fn field_after<'a>(fields: &[&'a str], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .position(|f| *f == key)
        .and_then(|idx| fields.get(idx + 1).copied())
}
