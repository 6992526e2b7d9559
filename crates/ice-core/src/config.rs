//! Relay harvesting and discovery settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use jingle_infra_common::EntityAddress;

use crate::relay::loss::LossConfig;

/// Statically configured relay or tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedNode {
    /// Service address of the node
    pub address: EntityAddress,
    /// Whether the node relays media; otherwise it only tracks other nodes
    #[serde(default)]
    pub relay: bool,
}

/// Settings for Jingle Nodes discovery and relay candidate harvesting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Master switch for relay harvesting
    pub enabled: bool,

    /// Walk the server's service directory looking for relays
    pub auto_discovery: bool,

    /// Also query the services advertised by online buddies
    pub search_buddies: bool,

    /// Stop collecting once more relays than this are known
    pub max_entries: usize,

    /// Maximum tracker recursion depth
    pub max_depth: u32,

    /// Stop querying once more nodes than this were visited
    pub max_search_nodes: usize,

    /// Transport protocol relays must offer
    pub protocol: String,

    /// Comma separated service name prefixes searched first; `off` disables
    pub search_prefixes: String,

    /// Stop the directory walk after the first productive branch
    pub stop_on_first: bool,

    /// Base signaling reply timeout in milliseconds
    pub reply_timeout_ms: u64,

    /// Statically configured nodes, searched before anything else
    pub trusted_nodes: Vec<TrustedNode>,

    /// Minimum interval between packet loss warnings, in milliseconds
    pub loss_log_interval_ms: u64,

    /// Loss ratio above which a warning is logged
    pub loss_ratio_threshold: f64,

    /// Sequence gaps at or above this count as a single lost packet
    pub reorder_threshold: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_discovery: true,
            search_buddies: false,
            max_entries: 6,
            max_depth: 3,
            max_search_nodes: 20,
            protocol: "udp".to_string(),
            search_prefixes: "relay".to_string(),
            stop_on_first: true,
            reply_timeout_ms: 5000,
            trusted_nodes: Vec::new(),
            loss_log_interval_ms: 5000,
            loss_ratio_threshold: 0.05,
            reorder_threshold: 0x00FF,
        }
    }
}

impl RelayConfig {
    /// Parsed search prefixes; empty when prefix search is disabled
    pub fn prefixes(&self) -> Vec<String> {
        let raw = self.search_prefixes.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("off") {
            return Vec::new();
        }
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Per-request timeout for tracker and directory queries
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms.saturating_mul(3) / 2)
    }

    /// Timeout for a relay channel allocation round trip
    pub fn allocation_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms.saturating_mul(21) / 2)
    }

    /// Loss accounting settings for relayed sockets
    pub fn loss_config(&self) -> LossConfig {
        LossConfig {
            log_interval: Duration::from_millis(self.loss_log_interval_ms),
            ratio_threshold: self.loss_ratio_threshold,
            reorder_threshold: self.reorder_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_search_limits() {
        let config = RelayConfig::default();
        assert_eq!(config.max_entries, 6);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_search_nodes, 20);
        assert_eq!(config.protocol, "udp");
        assert_eq!(config.discovery_timeout(), Duration::from_millis(7500));
        assert_eq!(config.allocation_timeout(), Duration::from_millis(52500));
    }

    #[test]
    fn prefixes_parse_and_disable() {
        let mut config = RelayConfig {
            search_prefixes: " relay, jn ,,stun".to_string(),
            ..Default::default()
        };
        assert_eq!(config.prefixes(), vec!["relay", "jn", "stun"]);

        config.search_prefixes = "off".to_string();
        assert!(config.prefixes().is_empty());
        config.search_prefixes = String::new();
        assert!(config.prefixes().is_empty());
    }

    #[test]
    fn deserializes_partial_document() {
        let config: RelayConfig = serde_json::from_str(
            r#"{"max_depth": 1, "trusted_nodes": [{"address": "relay.example.org", "relay": true}]}"#,
        )
        .unwrap();
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.max_entries, 6);
        assert_eq!(config.trusted_nodes.len(), 1);
        assert!(config.trusted_nodes[0].relay);
    }
}
