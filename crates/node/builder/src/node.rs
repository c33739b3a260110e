//! Building and launching a node.

use std::{
    fs,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use eyre::{Result, WrapErr};
use hyrule_net_discovery::DiscoveryService;
use hyrule_net_peers::MembershipTable;
use hyrule_net_transport::{HttpTransport, PeerService, PeerTransport, TimeoutTransport};
use hyrule_node_core::NodeConfig;
use hyrule_primitives::PeerInfo;
use hyrule_rpc_server::RpcServer;
use hyrule_storage::{ContentStore, MemoryBackend, RedbBackend};
use hyrule_sync::SyncEngine;
use hyrule_tasks::TaskExecutor;
use tracing::{error, info};

use crate::{NodeComponents, NodeHandle, NodeService, maintenance};

/// Assembles a [`Node`] from its configuration.
///
/// Outbound requests go over HTTP (through the proxy when enabled) unless a
/// transport is supplied with [`with_transport`](Self::with_transport).
pub struct NodeBuilder {
    config: NodeConfig,
    transport: Option<Arc<dyn PeerTransport>>,
}

impl std::fmt::Debug for NodeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl NodeBuilder {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn PeerTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn open_store(&self) -> Result<ContentStore> {
        let budget = self.config.storage.capacity;
        let store = match self.config.db_path() {
            Some(path) => {
                fs::create_dir_all(&self.config.storage.path).wrap_err_with(|| {
                    format!("failed to create {}", self.config.storage.path.display())
                })?;
                let backend = RedbBackend::open(&path)
                    .wrap_err_with(|| format!("failed to open {}", path.display()))?;
                ContentStore::open(backend, budget)?
            }
            None => ContentStore::open(MemoryBackend::new(), budget)?,
        };
        Ok(store)
    }

    fn default_transport(&self) -> Result<Arc<dyn PeerTransport>> {
        let config = self.config.transport_config();
        let http = HttpTransport::new(&config).wrap_err("failed to build HTTP client")?;
        Ok(Arc::new(TimeoutTransport::new(http, config.request_timeout)))
    }

    pub fn build(self) -> Result<Node> {
        self.config.validate()?;

        let store = Arc::new(self.open_store()?);
        let transport = match &self.transport {
            Some(transport) => transport.clone(),
            None => self.default_transport()?,
        };

        let config = self.config;
        let local = PeerInfo::new(config.advertise_addr(), config.role(), config.storage.capacity);
        let table = Arc::new(MembershipTable::new(local.id));

        let version_store = store.clone();
        let discovery = Arc::new(
            DiscoveryService::new(
                config.discovery_config(),
                local.clone(),
                table.clone(),
                transport.clone(),
            )
            .with_manifest_version(Arc::new(move || version_store.manifest().version)),
        );
        let sync = Arc::new(SyncEngine::new(
            config.sync_config(),
            store.clone(),
            table.clone(),
            transport,
        ));
        let service = Arc::new(NodeService::new(
            discovery.clone(),
            store.clone(),
            config.replication_eviction(),
        ));

        let stats = store.stats();
        info!(
            id = %local.id,
            address = %local.address,
            role = %local.role,
            objects = stats.objects,
            budget = %stats.budget,
            "Node built"
        );

        let components = Arc::new(NodeComponents {
            local,
            store,
            table,
            discovery,
            sync,
            proxy_enabled: config.proxy.enabled,
            started_at: Instant::now(),
        });
        Ok(Node {
            config,
            components,
            service,
        })
    }
}

/// A built node, not yet running.
#[derive(Debug)]
pub struct Node {
    config: NodeConfig,
    components: Arc<NodeComponents>,
    service: Arc<NodeService>,
}

impl Node {
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn components(&self) -> &Arc<NodeComponents> {
        &self.components
    }

    /// The handler peers talk to.
    pub fn service(&self) -> Arc<dyn PeerService> {
        self.service.clone()
    }

    pub fn rpc_server(&self) -> RpcServer {
        RpcServer::new(self.components.clone(), self.service())
    }

    /// Spawn the discovery, sync and maintenance loops.
    pub fn spawn_services(&self, executor: &TaskExecutor) {
        let discovery = self.components.discovery.clone();
        executor.spawn_critical_with_shutdown("discovery", move |shutdown| {
            discovery.run(shutdown)
        });

        let sync = self.components.sync.clone();
        executor.spawn_critical_with_shutdown("sync", move |shutdown| sync.run(shutdown));

        let settings = &self.config.maintenance;
        let store = self.components.store.clone();
        let every = Duration::from_secs(settings.verify_interval_secs);
        executor.spawn_critical_with_shutdown("integrity", move |shutdown| {
            maintenance::run_integrity_checks(store, every, shutdown)
        });

        let store = self.components.store.clone();
        let every = Duration::from_secs(settings.monitor_interval_secs);
        executor.spawn_critical_with_shutdown("storage-monitor", move |shutdown| {
            maintenance::run_storage_monitor(store, every, shutdown)
        });
    }

    /// Bind the HTTP listener, then spawn the server and every background
    /// loop.
    pub async fn launch(self, executor: &TaskExecutor) -> Result<NodeHandle> {
        let listener = RpcServer::bind(self.config.listen_addr()).await?;
        let local_addr: SocketAddr = listener.local_addr()?;

        let server = self.rpc_server();
        executor.spawn_critical_with_shutdown("rpc", move |shutdown| async move {
            if let Err(err) = server.serve(listener, shutdown).await {
                error!(error = %err, "HTTP server failed");
            }
        });
        self.spawn_services(executor);

        info!(%local_addr, "Node started");
        Ok(NodeHandle::new(
            self.components,
            local_addr,
            executor.on_shutdown_signal().clone(),
        ))
    }
}
