//! Contact attribution
//!
//! Sessions are attributed to a contact for display purposes only; the
//! roster itself belongs to the host application.

use serde::{Deserialize, Serialize};

use jingle_infra_common::EntityAddress;

/// Remote party of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contact {
    /// Address the session is with
    pub address: EntityAddress,
    /// Name shown to the user, when the roster has one
    pub display_name: Option<String>,
    /// Created on the fly for a party missing from the roster
    pub volatile: bool,
}

impl Contact {
    /// A roster contact
    pub fn new(address: impl Into<EntityAddress>, display_name: Option<String>) -> Self {
        Self {
            address: address.into(),
            display_name,
            volatile: false,
        }
    }

    /// A placeholder contact for an unknown party
    pub fn volatile(address: impl Into<EntityAddress>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
            volatile: true,
        }
    }

    /// Name to show, falling back to the bare address
    pub fn display(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.address.bare().to_string())
    }
}

/// Read-only lookup into the host application's contact list
pub trait ContactResolver: Send + Sync {
    /// Contact for `address`, if known
    fn find_contact(&self, address: &EntityAddress) -> Option<Contact>;

    /// Contact for `address`, or a volatile one when unknown
    fn resolve(&self, address: &EntityAddress) -> Contact {
        self.find_contact(address)
            .unwrap_or_else(|| Contact::volatile(address.clone()))
    }
}

/// Resolver that knows nobody
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContacts;

impl ContactResolver for NoContacts {
    fn find_contact(&self, _address: &EntityAddress) -> Option<Contact> {
        None
    }
}
