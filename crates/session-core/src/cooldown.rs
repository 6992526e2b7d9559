//! Security error cooldown
//!
//! After a session with a party ends in `security-error`, direct transfers
//! to that party are suppressed for a number of attempts so the caller can
//! fall back to a server-relayed path.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use jingle_infra_common::EntityAddress;

/// Per-party security error counters, owned by one provider
#[derive(Debug)]
pub struct SecurityErrorCooldown {
    attempts: u32,
    timers: Mutex<HashMap<EntityAddress, u32>>,
}

impl SecurityErrorCooldown {
    /// Suppress the next `attempts` direct transfers after a security error
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Record a security error with `party`
    pub fn arm(&self, party: &EntityAddress) {
        if self.attempts == 0 {
            return;
        }
        debug!("Security error with {}, suppressing {} direct transfers", party.bare(), self.attempts);
        self.timers.lock().insert(party.bare(), self.attempts);
    }

    /// Whether a direct transfer to `party` should be suppressed
    ///
    /// Each call consumes one attempt.
    pub fn has_security_error(&self, party: &EntityAddress) -> bool {
        let key = party.bare();
        let mut timers = self.timers.lock();
        match timers.get_mut(&key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                if *remaining == 0 {
                    timers.remove(&key);
                }
                true
            }
            _ => false,
        }
    }

    /// Attempts still suppressed for `party`
    pub fn remaining(&self, party: &EntityAddress) -> u32 {
        self.timers.lock().get(&party.bare()).copied().unwrap_or(0)
    }

    /// Forget every counter
    pub fn clear(&self) {
        self.timers.lock().clear();
    }
}

impl Default for SecurityErrorCooldown {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SECURITY_ERROR_COOLDOWN)
    }
}
