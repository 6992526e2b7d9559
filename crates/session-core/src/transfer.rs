//! File transfer service
//!
//! Entry point for sending files and for offers arriving from the signaling
//! layer. Sends to a party with a recent security error are routed to the
//! HTTP upload fallback instead of Jingle.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use jingle_infra_common::EntityAddress;

use crate::config::TransferConfig;
use crate::contact::ContactResolver;
use crate::cooldown::SecurityErrorCooldown;
use crate::errors::{Result, SessionError};
use crate::events::{ObserverHandle, ObserverSet};
use crate::registry::SessionRegistry;
use crate::session::FileOfferSession;
use crate::signaling::JingleSignaling;
use crate::types::{FileMetadata, SessionId};

/// Receives file transfer lifecycle notifications
pub trait FileTransferListener: Send + Sync {
    /// An incoming offer arrived
    fn on_request_received(&self, _session: &Arc<FileOfferSession>) {}

    /// A transfer was started: an outgoing offer was sent or an incoming
    /// one accepted
    fn on_transfer_created(&self, _session: &Arc<FileOfferSession>) {}

    /// An incoming offer was declined
    fn on_request_rejected(&self, _session: &Arc<FileOfferSession>) {}
}

/// How `send_file` routed a transfer
#[derive(Debug, Clone)]
pub enum TransferRoute {
    /// Sent as a Jingle file offer
    Jingle(Arc<FileOfferSession>),
    /// Direct transfer suppressed; use the HTTP upload path
    HttpFallback,
}

/// A session-initiate carrying a file offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingOffer {
    /// Signaling session id
    pub session_id: SessionId,
    /// Full address of the sender
    pub from: EntityAddress,
    /// Offered file
    pub file: FileMetadata,
}

/// Sends and receives files over Jingle for one account
pub struct FileTransferService {
    registry: SessionRegistry,
    signaling: Arc<dyn JingleSignaling>,
    contacts: Arc<dyn ContactResolver>,
    cooldown: Arc<SecurityErrorCooldown>,
    listeners: Arc<ObserverSet<dyn FileTransferListener>>,
    config: TransferConfig,
}

impl FileTransferService {
    /// Create a service registering its sessions in `registry`
    pub fn new(
        registry: SessionRegistry,
        signaling: Arc<dyn JingleSignaling>,
        contacts: Arc<dyn ContactResolver>,
        cooldown: Arc<SecurityErrorCooldown>,
        config: TransferConfig,
    ) -> Self {
        Self {
            registry,
            signaling,
            contacts,
            cooldown,
            listeners: Arc::new(ObserverSet::new()),
            config,
        }
    }

    /// Register a transfer listener
    pub fn add_listener(&self, listener: Arc<dyn FileTransferListener>) -> ObserverHandle {
        self.listeners.add(listener)
    }

    /// Deregister a transfer listener
    pub fn remove_listener(&self, handle: ObserverHandle) -> bool {
        self.listeners.remove(handle)
    }

    /// Largest file `send_file` accepts
    pub fn max_file_length(&self) -> u64 {
        self.config.max_file_length
    }

    /// Security error cooldown shared by this service's sessions
    pub fn cooldown(&self) -> &Arc<SecurityErrorCooldown> {
        &self.cooldown
    }

    /// Send `file` to `recipient`
    ///
    /// Fails only if the file cannot be offered at all (missing, not a
    /// regular file, too large). Signaling failures leave the returned
    /// session in `error`.
    pub async fn send_file(
        &self,
        recipient: &EntityAddress,
        file: &Path,
        description: Option<String>,
    ) -> Result<TransferRoute> {
        let meta = tokio::fs::metadata(file).await?;
        if !meta.is_file() {
            return Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", file.display()),
            )));
        }
        if meta.len() > self.config.max_file_length {
            return Err(SessionError::FileTooLarge {
                path: file.to_path_buf(),
                size: meta.len(),
                max: self.config.max_file_length,
            });
        }

        if self.cooldown.has_security_error(recipient) {
            info!("Recent security error with {}, using HTTP upload", recipient.bare());
            return Ok(TransferRoute::HttpFallback);
        }

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut metadata = FileMetadata::new(name, meta.len());
        metadata.description = description;

        let session = FileOfferSession::outgoing(
            SessionId::new(),
            self.contacts.resolve(recipient),
            file.to_path_buf(),
            metadata,
            self.signaling.clone(),
            Some(self.cooldown.clone()),
        );
        self.registry.register(session.clone())?;
        self.listeners.notify(|l| l.on_transfer_created(&session));

        session.send_offer().await?;
        Ok(TransferRoute::Jingle(session))
    }

    /// Handle an incoming file offer
    pub fn receive_offer(&self, offer: IncomingOffer) -> Result<Arc<FileOfferSession>> {
        let contact = self.contacts.resolve(&offer.from);
        debug!(
            "File offer {} from {} ({} bytes)",
            offer.file.name,
            contact.display(),
            offer.file.size
        );

        let session = FileOfferSession::incoming_with_listeners(
            offer.session_id,
            contact,
            offer.file,
            self.signaling.clone(),
            Some(self.listeners.clone()),
        );
        self.registry.register(session.clone())?;
        self.listeners.notify(|l| l.on_request_received(&session));
        Ok(session)
    }
}
