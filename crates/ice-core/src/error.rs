//! Error types for ice-core

use thiserror::Error;

/// Result type for ICE and relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while harvesting, relaying or discovering relay nodes
#[derive(Debug, Error)]
pub enum Error {
    /// Socket level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed STUN datagram
    #[error("STUN error: {0}")]
    StunError(String),

    /// Unusable transport address (empty host, zero port, unparseable literal)
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A socket with the same local address is already registered
    #[error("Socket already registered for {0}")]
    AlreadyRegistered(std::net::SocketAddr),

    /// The relay refused or failed the request
    #[error("Relay error: {0}")]
    Relay(String),

    /// A discovery or allocation round trip produced no reply in time
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// The signaling connection is gone
    #[error("Not connected")]
    NotConnected,

    /// Generic ICE failure
    #[error("ICE error: {0}")]
    IceError(String),
}

impl Error {
    /// Whether the failure means further requests on the same connection are pointless
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::NotConnected)
    }
}
