//! Common infrastructure for the Jingle provider stack.
//!
//! This crate carries the pieces every other crate in the workspace leans on:
//! the XMPP-style [`EntityAddress`] used to name remote parties and relay
//! services, a shared error type, `tracing` subscriber setup, and the layered
//! settings loader used by the provider configuration.

pub mod address;
pub mod errors;
pub mod logging;
pub mod settings;

pub use address::EntityAddress;
pub use errors::{Error, ErrorContext, ErrorExt, Result};
pub use logging::{setup_logging, LoggingConfig, LoggingSettings};
pub use settings::load_settings;
