//! World configuration and defaults.

use serde::{Deserialize, Serialize};

/// Default maximum number of concurrent sessions.
pub const DEFAULT_MAX_SLOTS: u32 = 50;

/// Default maximum display name length, in characters.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 15;

/// Limits applied by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Number of plots, and therefore of concurrent sessions
    #[serde(default = "default_max_slots")]
    pub max_slots: u32,

    /// Maximum display name length after trimming
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

fn default_max_slots() -> u32 {
    DEFAULT_MAX_SLOTS
}

fn default_max_name_length() -> usize {
    DEFAULT_MAX_NAME_LENGTH
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_slots: DEFAULT_MAX_SLOTS,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl WorldConfig {
    /// Checks the limits for values the coordinator cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_slots == 0 {
            return Err("max_slots must be greater than 0".to_string());
        }
        if self.max_name_length == 0 {
            return Err("max_name_length must be greater than 0".to_string());
        }
        Ok(())
    }
}
