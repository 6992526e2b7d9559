//! Provider errors

use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the provider facade
#[derive(Debug, Error)]
pub enum Error {
    /// Settings or logging setup failed
    #[error(transparent)]
    Infra(#[from] jingle_infra_common::Error),

    /// Relay or ICE failure
    #[error(transparent)]
    Ice(#[from] jingle_ice_core::Error),

    /// Session failure
    #[error(transparent)]
    Session(#[from] jingle_session_core::SessionError),
}
