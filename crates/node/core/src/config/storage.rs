//! Storage and maintenance configuration for TOML persistence.

use std::path::PathBuf;

use hyrule_primitives::CapacityBudget;
use serde::{Deserialize, Serialize};

use crate::constants::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the object database
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Capacity budget, e.g. "10GiB" or "1000objects"
    #[serde(default = "default_capacity")]
    pub capacity: CapacityBudget,

    /// Keep objects in memory only
    #[serde(default)]
    pub memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            capacity: default_capacity(),
            memory: false,
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_PATH)
}

fn default_capacity() -> CapacityBudget {
    CapacityBudget::gib(DEFAULT_CAPACITY_GIB)
}

/// Periodic integrity and usage checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Seconds between integrity checks
    #[serde(default = "default_verify_interval_secs")]
    pub verify_interval_secs: u64,

    /// Seconds between storage usage checks
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            verify_interval_secs: default_verify_interval_secs(),
            monitor_interval_secs: default_monitor_interval_secs(),
        }
    }
}

fn default_verify_interval_secs() -> u64 {
    DEFAULT_VERIFY_INTERVAL_SECS
}

fn default_monitor_interval_secs() -> u64 {
    DEFAULT_MONITOR_INTERVAL_SECS
}
