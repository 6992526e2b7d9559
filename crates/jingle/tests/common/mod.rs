// Shared fakes for provider tests
//
// `FakeNetwork` stands in for the account's XMPP connection on both the
// relay side and the Jingle session side.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use jingle::ice_core::Result as IceResult;
use jingle::prelude::*;
use jingle::session_core::{NoContacts, SignalingResult};

pub const ACCOUNT: &str = "alice@example.org/desktop";

#[derive(Default)]
pub struct FakeNetwork {
    pub channel: Option<RelayChannel>,
    pub items: Vec<EntityAddress>,
    pub services: HashMap<EntityAddress, Vec<TrackerEntry>>,
    pub query_delay: Option<Duration>,
    pub channel_requests: AtomicUsize,
    pub offers: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn with_channel(host: &str, local_port: u16, remote_port: u16) -> Self {
        Self {
            channel: Some(RelayChannel {
                host: host.to_string(),
                local_port,
                remote_port,
                protocol: "udp".to_string(),
            }),
            ..Self::default()
        }
    }

    pub fn tracker(mut self, node: &str, entries: Vec<TrackerEntry>) -> Self {
        self.items.push(node.into());
        self.services.insert(node.into(), entries);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            relay_signaling: self.clone(),
            jingle_signaling: self.clone(),
            contacts: Arc::new(NoContacts),
            presences: None,
        }
    }
}

#[async_trait]
impl RelaySignaling for FakeNetwork {
    fn is_connected(&self) -> bool {
        true
    }

    fn local_address(&self) -> EntityAddress {
        ACCOUNT.into()
    }

    fn service_domain(&self) -> EntityAddress {
        "example.org".into()
    }

    async fn resolve_channel(
        &self,
        _relay: &EntityAddress,
        _timeout: Duration,
    ) -> IceResult<Option<RelayChannel>> {
        self.channel_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.channel.clone())
    }

    async fn discover_items(
        &self,
        _service: &EntityAddress,
        _timeout: Duration,
    ) -> IceResult<Vec<EntityAddress>> {
        Ok(self.items.clone())
    }

    async fn query_services(
        &self,
        node: &EntityAddress,
        _timeout: Duration,
    ) -> IceResult<Option<Vec<TrackerEntry>>> {
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.services.get(node).cloned())
    }
}

#[async_trait]
impl JingleSignaling for FakeNetwork {
    async fn send_file_offer(
        &self,
        session: &SessionId,
        to: &EntityAddress,
        file: &FileMetadata,
    ) -> SignalingResult<()> {
        self.offers.lock().push(format!("{} {} {}", session, to, file.name));
        Ok(())
    }

    async fn send_call_initiate(&self, _session: &SessionId, _to: &EntityAddress) -> SignalingResult<()> {
        Ok(())
    }

    async fn accept_file(&self, _session: &SessionId, _target: &Path) -> SignalingResult<()> {
        Ok(())
    }

    async fn accept_call(&self, _session: &SessionId) -> SignalingResult<()> {
        Ok(())
    }

    async fn cancel(&self, _session: &SessionId) -> SignalingResult<()> {
        Ok(())
    }

    async fn terminate(
        &self,
        _session: &SessionId,
        _reason: &TerminationReason,
        _text: Option<&str>,
    ) -> SignalingResult<()> {
        Ok(())
    }
}

pub fn loopback_component() -> Arc<IceComponent> {
    let component = IceComponent::new("audio", RTP_COMPONENT_ID);
    component.add_local_candidate(IceCandidate::new(
        jingle::ice_core::CandidateType::Host,
        RTP_COMPONENT_ID,
        jingle::ice_core::TransportType::Udp,
        "127.0.0.1:5000".parse().unwrap(),
        None,
    ));
    Arc::new(component)
}

pub fn provider(network: &Arc<FakeNetwork>, config: ProviderConfig) -> JingleProvider {
    JingleProvider::new(ACCOUNT.into(), config, network.collaborators())
}
