//! CLI argument groups.
//!
//! Every override is optional so that [`NodeConfig::apply_args`] only
//! replaces what was given on the command line.
//!
//! [`NodeConfig::apply_args`]: crate::NodeConfig::apply_args

use clap::Args;

mod log;
mod network;
mod proxy;
mod storage;
mod sync;

pub use log::LogArgs;
pub use network::NetworkArgs;
pub use proxy::ProxyArgs;
pub use storage::StorageArgs;
pub use sync::{DiscoveryArgs, SyncArgs};

/// Arguments of `hyrule-node start`.
#[derive(Debug, Clone, Default, Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    #[command(flatten)]
    pub sync: SyncArgs,

    #[command(flatten)]
    pub proxy: ProxyArgs,
}
