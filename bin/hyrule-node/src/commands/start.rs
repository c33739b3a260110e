//! `hyrule-node start`: run a node until interrupted.

use std::time::Duration;

use eyre::{Result, WrapErr};
use hyrule_node_builder::NodeBuilder;
use hyrule_node_core::{NodeConfig, args::LogArgs, constants::VERSION, logging};
use hyrule_tasks::TaskManager;
use tracing::{error, info, warn};

use crate::cli::StartCommand;

/// Time given to background tasks to wind down after the shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) async fn run(logs: &LogArgs, command: StartCommand) -> Result<()> {
    logging::init_logging(logs)?;

    let mut config = NodeConfig::load_or_default(&command.config)
        .wrap_err_with(|| format!("failed to load {}", command.config.display()))?;
    config.apply_args(&command.args);

    info!(
        version = VERSION,
        role = %config.role(),
        listen = %config.listen_addr(),
        advertise = %config.advertise_addr(),
        capacity = %config.capacity_summary(),
        "Starting Hyrule node"
    );
    if config.proxy.enabled {
        info!(proxy = %config.proxy.addr, "Routing peer traffic through SOCKS5 proxy");
    }

    let mut task_manager = TaskManager::current();
    let executor = task_manager.executor();
    let node = NodeBuilder::new(config).build()?.launch(&executor).await?;
    info!(addr = %node.local_addr(), "Serving HTTP API");

    let signal = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for ctrl-c");
        }
    };
    match task_manager.wait_for(signal).await {
        Ok(()) => info!("Received shutdown signal"),
        Err(err) => error!(error = %err, "Critical task failed"),
    }

    if !task_manager.graceful_shutdown(SHUTDOWN_TIMEOUT).await {
        warn!("Some tasks did not stop in time");
    }
    let stats = node.components().store.stats();
    info!(objects = stats.objects, "Node shutdown complete");
    Ok(())
}
