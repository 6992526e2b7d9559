// Shared fakes for session tests
//
// `RecordingSignaling` logs every outbound request and can be told to fail
// individual operations. `StatusRecorder` collects observer notifications.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use jingle_infra_common::EntityAddress;
use jingle_session_core::prelude::*;
use jingle_session_core::{ProgressEvent, SignalingResult};

#[derive(Default)]
pub struct RecordingSignaling {
    requests: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, SignalingError>>,
}

impl RecordingSignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, operation: &'static str, error: SignalingError) {
        self.failures.lock().insert(operation, error);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn record(&self, operation: &'static str, detail: String) -> SignalingResult<()> {
        self.requests.lock().push(format!("{} {}", operation, detail));
        match self.failures.lock().get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl JingleSignaling for RecordingSignaling {
    async fn send_file_offer(
        &self,
        session: &SessionId,
        to: &EntityAddress,
        file: &FileMetadata,
    ) -> SignalingResult<()> {
        self.record("offer", format!("{} {} {}", session, to, file.name))
    }

    async fn send_call_initiate(&self, session: &SessionId, to: &EntityAddress) -> SignalingResult<()> {
        self.record("call", format!("{} {}", session, to))
    }

    async fn accept_file(&self, session: &SessionId, target: &Path) -> SignalingResult<()> {
        self.record("accept", format!("{} {}", session, target.display()))
    }

    async fn accept_call(&self, session: &SessionId) -> SignalingResult<()> {
        self.record("answer", session.to_string())
    }

    async fn cancel(&self, session: &SessionId) -> SignalingResult<()> {
        self.record("cancel", session.to_string())
    }

    async fn terminate(
        &self,
        session: &SessionId,
        reason: &TerminationReason,
        _text: Option<&str>,
    ) -> SignalingResult<()> {
        self.record("terminate", format!("{} {}", session, reason))
    }
}

#[derive(Default)]
pub struct StatusRecorder {
    pub events: Mutex<Vec<SessionStatusEvent>>,
    pub progress: Mutex<Vec<u64>>,
}

impl StatusRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn states(&self) -> Vec<(SessionState, SessionState)> {
        self.events.lock().iter().map(|e| (e.old_state, e.new_state)).collect()
    }

    pub fn last(&self) -> Option<SessionStatusEvent> {
        self.events.lock().last().cloned()
    }
}

impl SessionObserver for StatusRecorder {
    fn on_status_changed(&self, event: &SessionStatusEvent) {
        self.events.lock().push(event.clone());
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.progress.lock().push(event.transferred);
    }
}

pub struct Roster(pub Vec<Contact>);

impl ContactResolver for Roster {
    fn find_contact(&self, address: &EntityAddress) -> Option<Contact> {
        self.0.iter().find(|c| c.address == address.bare()).cloned()
    }
}

pub fn bob() -> EntityAddress {
    "bob@example.org/laptop".into()
}

pub fn incoming_offer(
    signaling: Arc<RecordingSignaling>,
    id: &str,
) -> Arc<FileOfferSession> {
    FileOfferSession::incoming(
        SessionId::from(id),
        Contact::volatile(bob()),
        FileMetadata::new("photo.jpg", 2048).with_mime_type("image/jpeg"),
        signaling,
    )
}

pub fn outgoing_offer(
    signaling: Arc<RecordingSignaling>,
    cooldown: Option<Arc<SecurityErrorCooldown>>,
) -> Arc<FileOfferSession> {
    FileOfferSession::outgoing(
        SessionId::new(),
        Contact::volatile(bob()),
        "/tmp/report.pdf".into(),
        FileMetadata::new("report.pdf", 4096),
        signaling,
        cooldown,
    )
}
