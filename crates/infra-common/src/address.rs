//! Entity addresses
//!
//! Remote parties, relay trackers and discovery roots are all named by an
//! XMPP address of the form `[local@]domain[/resource]`. The core never
//! parses stanzas, so the address is kept as an opaque string with just
//! enough structure to compare bare addresses and prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of an XMPP entity (bare or full)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityAddress(String);

impl EntityAddress {
    /// Create an address from any string-like value
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into().trim().to_string())
    }

    /// The address as written
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address without its resource part
    pub fn bare(&self) -> EntityAddress {
        match self.0.split_once('/') {
            Some((bare, _)) => EntityAddress(bare.to_string()),
            None => self.clone(),
        }
    }

    /// The domain part of the address
    pub fn domain(&self) -> &str {
        let bare = self.0.split('/').next().unwrap_or_default();
        match bare.split_once('@') {
            Some((_, domain)) => domain,
            None => bare,
        }
    }

    /// Whether a resource part is present
    pub fn is_full(&self) -> bool {
        self.0.contains('/')
    }

    /// Prefix match used by relay search prioritisation
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for EntityAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityAddress {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
