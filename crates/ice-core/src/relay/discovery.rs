//! Jingle Nodes service discovery
//!
//! Walks trusted nodes, the server's service directory, the server host and
//! optionally online buddies, asking each node for the relays and trackers it
//! knows. The walk is bounded by depth, by the number of relays found and by
//! the number of nodes queried, and never queries the same address twice.
//! Results are merged into the account's [`RelayNodeService`] when the run
//! finishes.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use jingle_infra_common::EntityAddress;

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::relay::node::{MappedNodes, NodeKind, RelayNodeService, TrackerEntry};
use crate::relay::protocol::{PresenceSource, RelaySignaling};

/// Whether the discovery walk should go on after a directory pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFlow {
    /// Keep searching the remaining roots
    Continue,
    /// A productive branch was found and early stop is enabled
    Stop,
}

/// Outcome of one discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Relays found by this run
    pub relays: usize,
    /// Trackers found by this run
    pub trackers: usize,
    /// Nodes queried
    pub queried: usize,
    /// Whether the run ended because the connection went away
    pub interrupted: bool,
    /// Wall clock duration of the run
    pub elapsed: Duration,
}

#[derive(Default)]
struct SearchState {
    nodes: MappedNodes,
    visited: HashSet<EntityAddress>,
    disconnected: bool,
}

/// Background discovery of relay nodes for one account
pub struct RelayServiceDiscovery {
    service: Arc<RelayNodeService>,
    signaling: Arc<dyn RelaySignaling>,
    presences: Option<Arc<dyn PresenceSource>>,
    config: RelayConfig,
    run_lock: Mutex<()>,
}

impl RelayServiceDiscovery {
    /// Create a discovery task feeding `service`
    pub fn new(
        service: Arc<RelayNodeService>,
        signaling: Arc<dyn RelaySignaling>,
        config: RelayConfig,
    ) -> Self {
        Self {
            service,
            signaling,
            presences: None,
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Search the nodes of online buddies when enabled in the config
    pub fn with_presences(mut self, presences: Arc<dyn PresenceSource>) -> Self {
        self.presences = Some(presences);
        self
    }

    /// Node pool the run merges into
    pub fn service(&self) -> &Arc<RelayNodeService> {
        &self.service
    }

    /// Start a run on the runtime
    pub fn spawn(self: Arc<Self>) -> JoinHandle<DiscoveryReport> {
        tokio::spawn(async move { self.run().await })
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Wait until no run is in progress
    pub async fn wait_idle(&self) {
        let _idle = self.run_lock.lock().await;
    }

    /// Perform one discovery run
    ///
    /// Runs for the same account are serialized. Failures of individual
    /// nodes are logged and skipped; a dropped connection ends the run with
    /// whatever was found so far.
    pub async fn run(&self) -> DiscoveryReport {
        let _running = self.run_lock.lock().await;
        let started = Instant::now();
        info!("Start Jingle Nodes discovery for {}", self.signaling.local_address());

        let mut state = SearchState::default();
        if self.signaling.is_connected() {
            self.search(&mut state).await;
        } else {
            debug!("Skipping Jingle Nodes discovery: not connected");
            state.disconnected = true;
        }

        let report = DiscoveryReport {
            relays: state.nodes.relay_count(),
            trackers: state.nodes.tracker_count(),
            queried: state.visited.len(),
            interrupted: state.disconnected,
            elapsed: started.elapsed(),
        };
        info!(
            "End of Jingle Nodes discovery: found {} relays for {} in {} ms",
            report.relays,
            self.signaling.local_address(),
            report.elapsed.as_millis()
        );
        self.service.add_entries(&state.nodes);
        report
    }

    async fn search(&self, state: &mut SearchState) {
        let depth = self.config.max_depth.saturating_sub(1);

        for entry in self.service.entries() {
            self.deep_search(&entry.address, depth, false, state).await;
        }

        if !self.config.auto_discovery || state.disconnected {
            return;
        }

        let domain = self.signaling.service_domain();
        if self.search_directory(&domain, depth, state).await == SearchFlow::Stop {
            return;
        }

        if let Some(host) = self.signaling.server_host() {
            self.deep_search(&host, depth, false, state).await;
        }

        if self.config.search_buddies {
            if let Some(presences) = &self.presences {
                for buddy in presences.available_presences().await {
                    self.deep_search(&buddy, depth, false, state).await;
                }
            }
        }
    }

    /// List a service directory and search its items, prefix matches first
    async fn search_directory(
        &self,
        directory: &EntityAddress,
        depth: u32,
        state: &mut SearchState,
    ) -> SearchFlow {
        let timeout = self.config.discovery_timeout();
        let items = match bounded(timeout, directory, self.signaling.discover_items(directory, timeout)).await {
            Ok(items) => items,
            Err(e) => {
                debug!("Service discovery on {} failed: {}", directory, e);
                state.disconnected |= e.is_disconnect();
                return SearchFlow::Continue;
            }
        };

        let prefixes = self.config.prefixes();
        for item in &items {
            if prefixes.iter().any(|p| item.starts_with(p)) {
                self.deep_search(item, depth, true, state).await;
                if self.config.stop_on_first {
                    return SearchFlow::Stop;
                }
            }
        }

        for item in &items {
            if !state.visited.contains(item) {
                self.deep_search(item, depth, false, state).await;
            }
            if self.config.stop_on_first {
                return SearchFlow::Stop;
            }
        }

        SearchFlow::Continue
    }

    /// Bounded walk from `start` through the trackers it reports
    async fn deep_search(
        &self,
        start: &EntityAddress,
        depth: u32,
        preferred: bool,
        state: &mut SearchState,
    ) {
        let own_address = self.signaling.local_address();
        let timeout = self.config.discovery_timeout();
        let mut pending = vec![(start.clone(), depth)];

        while let Some((node, depth)) = pending.pop() {
            if state.disconnected || !self.signaling.is_connected() {
                state.disconnected = true;
                return;
            }
            if state.nodes.relay_count() > self.config.max_entries || depth == 0 {
                continue;
            }
            if node == own_address || state.visited.contains(&node) {
                continue;
            }
            if state.visited.len() > self.config.max_search_nodes {
                return;
            }

            let reply = bounded(timeout, &node, self.signaling.query_services(&node, timeout)).await;
            state.visited.insert(node.clone());

            let entries = match reply {
                Ok(Some(entries)) => entries,
                Ok(None) => {
                    trace!("{} is not a tracker", node);
                    continue;
                }
                Err(e) => {
                    debug!("Tracker query to {} failed: {}", node, e);
                    state.disconnected |= e.is_disconnect();
                    continue;
                }
            };

            let mut trackers = Vec::new();
            for entry in entries {
                match entry.kind {
                    NodeKind::Tracker => {
                        trackers.push(entry.address.clone());
                        state.nodes.add_tracker(entry);
                    }
                    NodeKind::Relay if entry.protocol.eq_ignore_ascii_case(&self.config.protocol) => {
                        debug!("Found relay {} via {}", entry.address, node);
                        state.nodes.add_relay(TrackerEntry { preferred, ..entry });
                    }
                    NodeKind::Relay => {
                        trace!("Skipping relay {} offering {}", entry.address, entry.protocol);
                    }
                }
            }
            // reversed so the first reported tracker is searched first
            for tracker in trackers.into_iter().rev() {
                pending.push((tracker, depth - 1));
            }
        }
    }
}

async fn bounded<T>(
    timeout: Duration,
    target: &EntityAddress,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(target.to_string())),
    }
}
