// Shared fakes for relay tests
//
// `ScriptedSignaling` answers directory and tracker queries from in-memory
// tables and records the order in which nodes were asked.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use jingle_ice_core::error::{Error, Result};
use jingle_ice_core::relay::{PresenceSource, RelayChannel, RelaySignaling, TrackerEntry};
use jingle_infra_common::EntityAddress;

pub const OWN_ADDRESS: &str = "alice@example.org/desktop";
pub const DOMAIN: &str = "example.org";

#[derive(Default)]
pub struct ScriptedSignaling {
    pub disconnected: AtomicBool,
    pub server_host: Option<EntityAddress>,
    pub channel: Mutex<Option<Result<Option<RelayChannel>>>>,
    pub channel_requests: AtomicUsize,
    pub items: HashMap<EntityAddress, Vec<EntityAddress>>,
    pub services: HashMap<EntityAddress, Vec<TrackerEntry>>,
    pub queried: Mutex<Vec<EntityAddress>>,
    pub disconnect_after: Option<usize>,
    pub query_delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(channel: RelayChannel) -> Self {
        let signaling = Self::new();
        *signaling.channel.lock() = Some(Ok(Some(channel)));
        signaling
    }

    pub fn directory(mut self, service: &str, items: &[&str]) -> Self {
        self.items
            .insert(service.into(), items.iter().map(|i| EntityAddress::from(*i)).collect());
        self
    }

    pub fn tracker(mut self, node: &str, entries: Vec<TrackerEntry>) -> Self {
        self.services.insert(node.into(), entries);
        self
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().iter().map(|a| a.to_string()).collect()
    }
}

#[async_trait]
impl RelaySignaling for ScriptedSignaling {
    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    fn local_address(&self) -> EntityAddress {
        OWN_ADDRESS.into()
    }

    fn service_domain(&self) -> EntityAddress {
        DOMAIN.into()
    }

    fn server_host(&self) -> Option<EntityAddress> {
        self.server_host.clone()
    }

    async fn resolve_channel(
        &self,
        _relay: &EntityAddress,
        _timeout: Duration,
    ) -> Result<Option<RelayChannel>> {
        self.channel_requests.fetch_add(1, Ordering::SeqCst);
        match self.channel.lock().as_ref() {
            Some(Ok(channel)) => Ok(channel.clone()),
            Some(Err(_)) => Err(Error::Relay("service-unavailable".into())),
            None => Ok(None),
        }
    }

    async fn discover_items(
        &self,
        service: &EntityAddress,
        _timeout: Duration,
    ) -> Result<Vec<EntityAddress>> {
        Ok(self.items.get(service).cloned().unwrap_or_default())
    }

    async fn query_services(
        &self,
        node: &EntityAddress,
        _timeout: Duration,
    ) -> Result<Option<Vec<TrackerEntry>>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let count = {
            let mut queried = self.queried.lock();
            queried.push(node.clone());
            queried.len()
        };
        if let Some(limit) = self.disconnect_after {
            if count > limit {
                self.disconnected.store(true, Ordering::SeqCst);
                return Err(Error::NotConnected);
            }
        }
        Ok(self.services.get(node).cloned())
    }
}

pub struct StaticPresences(pub Vec<EntityAddress>);

#[async_trait]
impl PresenceSource for StaticPresences {
    async fn available_presences(&self) -> Vec<EntityAddress> {
        self.0.clone()
    }
}

pub fn channel(host: &str, local_port: u16, remote_port: u16) -> RelayChannel {
    RelayChannel {
        host: host.to_string(),
        local_port,
        remote_port,
        protocol: "udp".to_string(),
    }
}
