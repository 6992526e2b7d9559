//! Provider configuration
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [relay]
//! search_prefixes = "relay,jn"
//! trusted_nodes = [{ address = "relay.example.org", relay = true }]
//!
//! [transfer]
//! security_error_cooldown = 5
//! ```
//!
//! Any key can be overridden from the environment, e.g.
//! `JINGLE_RELAY__MAX_DEPTH=2`.

use std::path::Path;

use serde::Deserialize;

use jingle_ice_core::RelayConfig;
use jingle_infra_common::settings::{load_settings, load_settings_from_str};
use jingle_infra_common::{LoggingConfig, LoggingSettings};
use jingle_session_core::TransferConfig;

use crate::error::Result;

/// Environment variable prefix for provider settings
pub const ENV_PREFIX: &str = "JINGLE";

/// Complete provider settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Log output
    pub logging: LoggingSettings,
    /// Relay discovery and harvesting
    pub relay: RelayConfig,
    /// File transfer
    pub transfer: TransferConfig,
}

impl ProviderConfig {
    /// Load from an optional TOML file layered under `JINGLE_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(load_settings(path, ENV_PREFIX)?)
    }

    /// Parse from a TOML document layered under `JINGLE_*` variables
    pub fn from_toml(toml: &str) -> Result<Self> {
        Ok(load_settings_from_str(toml, ENV_PREFIX)?)
    }

    /// Logging configuration ready for [`jingle_infra_common::setup_logging`]
    pub fn logging_config(&self) -> Result<LoggingConfig> {
        Ok(LoggingConfig::try_from(self.logging.clone())?)
    }
}
