//! Sync settings.

use std::time::Duration;

use hyrule_storage::EvictionPolicy;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between rounds.
    pub interval: Duration,
    /// Object transfers in flight per peer.
    pub max_concurrent_transfers: usize,
    /// Peers synced at once.
    pub max_concurrent_peers: usize,
    /// Policy for inserting fetched objects. [`EvictionPolicy::Never`]
    /// refuses objects that do not fit rather than evicting local content.
    pub eviction: EvictionPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_concurrent_transfers: 10,
            max_concurrent_peers: 4,
            eviction: EvictionPolicy::Never,
        }
    }
}
