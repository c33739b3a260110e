//! Discovery and sync CLI arguments.

use clap::Args;

#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Discovery")]
pub struct DiscoveryArgs {
    /// Seconds between discovery rounds.
    #[arg(id = "discovery.interval", long = "discovery.interval", value_name = "SECS")]
    pub interval: Option<u64>,

    /// Peers contacted per round.
    #[arg(long = "discovery.fanout", value_name = "COUNT")]
    pub fanout: Option<usize>,

    /// Seconds after which a silent peer is dropped.
    #[arg(long = "discovery.liveness-timeout", value_name = "SECS")]
    pub liveness_timeout: Option<u64>,
}

#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Sync")]
pub struct SyncArgs {
    /// Seconds between sync rounds.
    #[arg(id = "sync.interval", long = "sync.interval", value_name = "SECS")]
    pub interval: Option<u64>,

    /// Object transfers in flight per peer.
    #[arg(long = "sync.max-transfers", value_name = "COUNT")]
    pub max_concurrent_transfers: Option<usize>,

    /// Peers synced at once.
    #[arg(long = "sync.max-peers", value_name = "COUNT")]
    pub max_concurrent_peers: Option<usize>,

    /// Evict local objects to make room for replicated ones.
    #[arg(long = "sync.evict")]
    pub evict_for_replication: bool,
}
