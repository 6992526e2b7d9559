//! File offer sessions
//!
//! An outgoing offer starts `fresh`, moves to `pending` once the
//! session-initiate is out and follows the signaling layer from there. An
//! incoming offer starts `pending` and waits for [`FileOfferSession::accept`]
//! or [`FileOfferSession::decline`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::contact::Contact;
use crate::cooldown::SecurityErrorCooldown;
use crate::errors::{Result, SessionError, SignalingError};
use crate::events::{ObserverHandle, ObserverSet, SessionObserver};
use crate::session::{SessionCore, SessionHandle};
use crate::signaling::{JingleSignaling, SignalingEvent};
use crate::state::{SessionState, TerminationReason};
use crate::transfer::FileTransferListener;
use crate::types::{Direction, FileMetadata, SessionId};

type TransferListeners = Arc<ObserverSet<dyn FileTransferListener>>;

/// One file transfer, either direction
pub struct FileOfferSession {
    core: SessionCore,
    transfer_id: String,
    metadata: FileMetadata,
    local_file: Mutex<Option<PathBuf>>,
    transferred: AtomicU64,
    accepted: AtomicBool,
    signaling: Arc<dyn JingleSignaling>,
    cooldown: Option<Arc<SecurityErrorCooldown>>,
    listeners: Option<TransferListeners>,
}

impl FileOfferSession {
    /// An offer we are about to send
    pub fn outgoing(
        id: SessionId,
        contact: Contact,
        file: PathBuf,
        metadata: FileMetadata,
        signaling: Arc<dyn JingleSignaling>,
        cooldown: Option<Arc<SecurityErrorCooldown>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            core: SessionCore::new(id, Direction::Outgoing, contact, SessionState::Fresh),
            transfer_id: Uuid::new_v4().to_string(),
            metadata,
            local_file: Mutex::new(Some(file)),
            transferred: AtomicU64::new(0),
            accepted: AtomicBool::new(false),
            signaling,
            cooldown,
            listeners: None,
        })
    }

    /// An offer received from `contact`
    pub fn incoming(
        id: SessionId,
        contact: Contact,
        metadata: FileMetadata,
        signaling: Arc<dyn JingleSignaling>,
    ) -> Arc<Self> {
        Self::incoming_with_listeners(id, contact, metadata, signaling, None)
    }

    pub(crate) fn incoming_with_listeners(
        id: SessionId,
        contact: Contact,
        metadata: FileMetadata,
        signaling: Arc<dyn JingleSignaling>,
        listeners: Option<TransferListeners>,
    ) -> Arc<Self> {
        let transfer_id = metadata
            .hash
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Arc::new(Self {
            core: SessionCore::new(id, Direction::Incoming, contact, SessionState::Pending),
            transfer_id,
            metadata,
            local_file: Mutex::new(None),
            transferred: AtomicU64::new(0),
            accepted: AtomicBool::new(false),
            signaling,
            cooldown: None,
            listeners,
        })
    }

    /// Shared session state
    pub fn core(&self) -> &SessionCore {
        &self.core
    }

    /// Transfer id shown to the user: the content hash when offered with one
    pub fn transfer_id(&self) -> &str {
        &self.transfer_id
    }

    /// Offered file description
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Local file: the source for outgoing offers, the target once accepted
    pub fn local_file(&self) -> Option<PathBuf> {
        self.local_file.lock().clone()
    }

    /// Register a status and progress observer
    pub fn observe(&self, observer: Arc<dyn SessionObserver>) -> ObserverHandle {
        self.core.add_observer(observer)
    }

    /// Send the session-initiate for an outgoing offer
    ///
    /// A signaling failure leaves the session in `error`.
    pub async fn send_offer(&self) -> Result<SessionState> {
        self.require(Direction::Outgoing, "send_offer")?;
        if self.core.state() != SessionState::Fresh {
            return Ok(self.core.state());
        }

        let result = self
            .signaling
            .send_file_offer(self.core.id(), &self.core.contact().address, &self.metadata)
            .await;
        match result {
            Ok(()) => {
                self.core
                    .transition(SessionState::Pending, None, Some("Waiting for remote to accept".into()));
            }
            Err(e) => {
                error!("Failed to send file offer {}: {}", self.core.id(), e);
                self.fail(&e);
            }
        }
        Ok(self.core.state())
    }

    /// Accept an incoming offer, writing to `target`
    ///
    /// `target` may be a directory, in which case the offered file name is
    /// used inside it. A second call returns [`SessionError::AlreadyAccepted`].
    /// File system or signaling failures move the session to `error` and are
    /// reported through the returned state.
    pub async fn accept(self: &Arc<Self>, target: &Path) -> Result<SessionState> {
        self.require(Direction::Incoming, "accept")?;
        let state = self.core.state();
        if state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                from: state,
                to: SessionState::Active,
            });
        }
        if self.accepted.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyAccepted(self.core.id().to_string()));
        }

        let target = match prepare_target(target, &self.metadata.name).await {
            Ok(target) => target,
            Err(e) => {
                warn!("Cannot receive {} into {}: {}", self.metadata.name, target.display(), e);
                self.core.release();
                self.core.transition(
                    SessionState::Error,
                    Some(TerminationReason::FailedApplication),
                    Some(e.to_string()),
                );
                return Ok(self.core.state());
            }
        };
        *self.local_file.lock() = Some(target.clone());

        if let Some(listeners) = &self.listeners {
            listeners.notify(|l| l.on_transfer_created(self));
        }

        match self.signaling.accept_file(self.core.id(), &target).await {
            Ok(()) => {
                self.core
                    .transition(SessionState::Active, None, Some("Session accepted".into()));
            }
            Err(e) => {
                error!("Failed to accept file offer {}: {}", self.core.id(), e);
                self.fail(&e);
            }
        }
        Ok(self.core.state())
    }

    /// Decline an incoming offer
    pub async fn decline(self: &Arc<Self>) -> Result<SessionState> {
        self.require(Direction::Incoming, "decline")?;
        if self.core.state().is_terminal() {
            return Ok(self.core.state());
        }

        if let Err(e) = self
            .signaling
            .terminate(self.core.id(), &TerminationReason::Decline, None)
            .await
        {
            warn!("Failed to decline file offer {}: {}", self.core.id(), e);
        }
        self.core.release();
        self.core.transition(
            SessionState::Cancelled,
            Some(TerminationReason::Decline),
            Some("Declined".into()),
        );

        if let Some(listeners) = &self.listeners {
            listeners.notify(|l| l.on_request_rejected(self));
        }
        Ok(self.core.state())
    }

    /// Cancel the transfer
    ///
    /// The remote party is notified best-effort; local cleanup happens even
    /// if it no longer knows the session. The cancellation notification
    /// carries the prior state as its detail. A no-op once terminal.
    pub async fn cancel(&self) -> SessionState {
        let old = self.core.state();
        if old.is_terminal() {
            debug!("Session {} already {}, nothing to cancel", self.core.id(), old);
            return old;
        }

        if let Err(e) = self.signaling.cancel(self.core.id()).await {
            error!("File transfer cancel failed for {}: {}", self.core.id(), e);
        }
        self.core.release();
        self.core.transition(
            SessionState::Cancelled,
            Some(TerminationReason::Cancel),
            Some(old.to_string()),
        );
        self.core.state()
    }

    /// Bytes transferred so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred.load(Ordering::SeqCst)
    }

    /// Record transfer progress; never moves backwards
    pub fn update_progress(&self, transferred: u64) -> u64 {
        let previous = self.transferred.fetch_max(transferred, Ordering::SeqCst);
        if transferred > previous {
            self.core.notify_progress(transferred);
            transferred
        } else {
            previous
        }
    }

    /// Apply a callback from the signaling layer
    pub fn handle_signaling(&self, event: SignalingEvent) {
        match event {
            SignalingEvent::StateChanged(state) => {
                self.core.transition(state, None, Some(format!("Jingle session {}", state)));
            }
            SignalingEvent::Started => {
                self.core
                    .transition(SessionState::Active, None, Some("Byte transfer started".into()));
            }
            SignalingEvent::Progress(bytes) => {
                self.update_progress(bytes);
            }
            SignalingEvent::Finished => {
                self.core.release();
                self.core.transition(
                    SessionState::Ended,
                    Some(TerminationReason::Success),
                    Some("Byte transfer completed".into()),
                );
            }
            SignalingEvent::Error(reason) | SignalingEvent::Terminated(reason) => {
                self.on_terminated(reason);
            }
        }
    }

    fn on_terminated(&self, reason: TerminationReason) {
        if reason == TerminationReason::SecurityError && self.core.direction() == Direction::Outgoing {
            if let Some(cooldown) = &self.cooldown {
                cooldown.arm(&self.core.contact().address);
            }
        }
        self.core.release();
        let state = reason.terminal_state();
        self.core.transition(state, Some(reason), None);
    }

    fn fail(&self, error: &SignalingError) {
        self.core.release();
        let reason = error.termination_reason();
        self.core
            .transition(failure_state(&reason), Some(reason), Some(error.to_string()));
    }

    fn require(&self, direction: Direction, operation: &'static str) -> Result<()> {
        if self.core.direction() == direction {
            Ok(())
        } else {
            Err(SessionError::WrongDirection {
                operation,
                direction: self.core.direction(),
            })
        }
    }
}

impl std::fmt::Debug for FileOfferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileOfferSession")
            .field("id", self.core.id())
            .field("direction", &self.core.direction())
            .field("state", &self.core.state())
            .field("file", &self.metadata.name)
            .field("transferred", &self.transferred_bytes())
            .finish()
    }
}

#[async_trait]
impl SessionHandle for FileOfferSession {
    fn id(&self) -> &SessionId {
        self.core.id()
    }

    fn direction(&self) -> Direction {
        self.core.direction()
    }

    fn state(&self) -> SessionState {
        self.core.state()
    }

    fn contact(&self) -> &Contact {
        self.core.contact()
    }

    fn transferred_bytes(&self) -> u64 {
        FileOfferSession::transferred_bytes(self)
    }

    async fn cancel(&self) -> SessionState {
        FileOfferSession::cancel(self).await
    }
}

/// Terminal state for a request that failed with `reason`
pub(crate) fn failure_state(reason: &TerminationReason) -> SessionState {
    match reason.terminal_state() {
        SessionState::Ended => SessionState::Error,
        state => state,
    }
}

/// Resolve and check the file an incoming offer is written to
async fn prepare_target(target: &Path, file_name: &str) -> std::io::Result<PathBuf> {
    let target = match tokio::fs::metadata(target).await {
        Ok(meta) if meta.is_dir() => target.join(plain_file_name(file_name)?),
        _ => target.to_path_buf(),
    };

    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let meta = tokio::fs::metadata(&parent).await?;
    if !meta.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", parent.display()),
        ));
    }
    if meta.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("{} is read-only", parent.display()),
        ));
    }
    Ok(target)
}

/// The offered name, if it names a file inside the target directory
///
/// The name comes from the remote party. Anything with a directory part,
/// an absolute path, `.` or `..` is refused.
fn plain_file_name(name: &str) -> std::io::Result<&str> {
    match Path::new(name).file_name().and_then(|n| n.to_str()) {
        Some(base) if base == name && !name.contains(['/', '\\']) => Ok(base),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Refusing offered file name {:?}", name),
        )),
    }
}
