//! Discovery and sync configuration for TOML persistence.

use serde::{Deserialize, Serialize};

use crate::constants::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Seconds between discovery rounds
    #[serde(default = "default_discovery_interval_secs")]
    pub interval_secs: u64,

    /// Peers contacted per round
    #[serde(default = "default_fanout")]
    pub fanout: usize,

    /// Seconds after which a silent peer is dropped
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_discovery_interval_secs(),
            fanout: default_fanout(),
            liveness_timeout_secs: default_liveness_timeout_secs(),
        }
    }
}

fn default_discovery_interval_secs() -> u64 {
    DEFAULT_DISCOVERY_INTERVAL_SECS
}

fn default_fanout() -> usize {
    DEFAULT_FANOUT
}

fn default_liveness_timeout_secs() -> u64 {
    DEFAULT_LIVENESS_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between sync rounds
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,

    /// Object transfers in flight per peer
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,

    /// Peers synced at once
    #[serde(default = "default_max_concurrent_peers")]
    pub max_concurrent_peers: usize,

    /// Evict local objects to make room for replicated ones
    #[serde(default)]
    pub evict_for_replication: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
            max_concurrent_peers: default_max_concurrent_peers(),
            evict_for_replication: false,
        }
    }
}

fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_max_concurrent_transfers() -> usize {
    DEFAULT_MAX_CONCURRENT_TRANSFERS
}

fn default_max_concurrent_peers() -> usize {
    DEFAULT_MAX_CONCURRENT_PEERS
}
