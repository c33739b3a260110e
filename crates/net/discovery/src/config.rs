//! Discovery settings.

use std::time::Duration;

/// Peers contacted per gossip round.
pub const DEFAULT_FANOUT: usize = 3;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Time between rounds.
    pub interval: Duration,
    /// Peers handshaked per round.
    pub fanout: usize,
    /// Peers not seen for this long are dropped.
    pub liveness_timeout: Duration,
    /// Anchor to bootstrap from. `None` on the anchor itself and on
    /// standalone nodes.
    pub anchor_addr: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            fanout: DEFAULT_FANOUT,
            liveness_timeout: Duration::from_secs(300),
            anchor_addr: None,
        }
    }
}
