//! File transfer settings

use serde::{Deserialize, Serialize};

/// Direct transfers suppressed after a security error
pub const DEFAULT_SECURITY_ERROR_COOLDOWN: u32 = 10;

/// Largest file offered over Jingle
pub const DEFAULT_MAX_FILE_LENGTH: u64 = 2_147_483_647;

/// Settings for Jingle file transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Direct transfer attempts suppressed after a security error
    pub security_error_cooldown: u32,
    /// Largest file size accepted by `send_file`, in bytes
    pub max_file_length: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            security_error_cooldown: DEFAULT_SECURITY_ERROR_COOLDOWN,
            max_file_length: DEFAULT_MAX_FILE_LENGTH,
        }
    }
}
