//! Node handle for managing a running node.

use std::{net::SocketAddr, sync::Arc};

use hyrule_tasks::Shutdown;

use crate::NodeComponents;

/// Handle to a running node.
///
/// All services are spawned as critical tasks and managed by the
/// `TaskManager`; the handle gives access to the components and the
/// shutdown signal.
#[derive(Debug)]
pub struct NodeHandle {
    components: Arc<NodeComponents>,
    local_addr: SocketAddr,
    shutdown: Shutdown,
}

impl NodeHandle {
    pub(crate) fn new(
        components: Arc<NodeComponents>,
        local_addr: SocketAddr,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            components,
            local_addr,
            shutdown,
        }
    }

    pub fn components(&self) -> &Arc<NodeComponents> {
        &self.components
    }

    /// Address the HTTP server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ask every node task to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for the shutdown signal.
    pub async fn wait_for_shutdown(&self) {
        self.shutdown.cancelled().await;
        tracing::info!("Node shutdown signalled");
    }
}
