//! Interface to the external Jingle signaling layer
//!
//! Outbound requests go through [`JingleSignaling`]; inbound callbacks are
//! delivered as [`SignalingEvent`]s through the
//! [`SessionRegistry`](crate::registry::SessionRegistry).

use std::path::Path;

use async_trait::async_trait;

use jingle_infra_common::EntityAddress;

use crate::errors::SignalingError;
use crate::state::{SessionState, TerminationReason};
use crate::types::{FileMetadata, SessionId};

/// Result of a signaling request
pub type SignalingResult<T> = std::result::Result<T, SignalingError>;

/// Outbound Jingle requests
#[async_trait]
pub trait JingleSignaling: Send + Sync {
    /// Send a file offer session-initiate
    async fn send_file_offer(
        &self,
        session: &SessionId,
        to: &EntityAddress,
        file: &FileMetadata,
    ) -> SignalingResult<()>;

    /// Send a call session-initiate
    async fn send_call_initiate(&self, session: &SessionId, to: &EntityAddress) -> SignalingResult<()>;

    /// Accept an incoming file offer, writing bytes to `target`
    async fn accept_file(&self, session: &SessionId, target: &Path) -> SignalingResult<()>;

    /// Accept an incoming call
    async fn accept_call(&self, session: &SessionId) -> SignalingResult<()>;

    /// Cancel a session in any state
    async fn cancel(&self, session: &SessionId) -> SignalingResult<()>;

    /// Close a session with a reason and optional human readable text
    async fn terminate(
        &self,
        session: &SessionId,
        reason: &TerminationReason,
        text: Option<&str>,
    ) -> SignalingResult<()>;
}

/// Inbound notification for one session
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// The signaling session changed state
    StateChanged(SessionState),
    /// Byte transfer began
    Started,
    /// Bytes transferred so far
    Progress(u64),
    /// Byte transfer completed
    Finished,
    /// The transfer failed with a reason
    Error(TerminationReason),
    /// A session-terminate was received
    Terminated(TerminationReason),
}
