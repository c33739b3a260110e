//! Node configuration handling.
//!
//! Configuration is split into sections:
//! - `network` - listening, advertised address and anchor settings
//! - `storage` - object database location and capacity budget
//! - `discovery` / `sync` - round intervals and concurrency
//! - `proxy` - SOCKS5 routing for outbound peer requests
//! - `maintenance` - integrity and usage checks
//!
//! Every field has a default, so a partial file (or none at all) is valid.

mod network;
mod replication;
mod storage;

pub use network::{NetworkConfig, ProxyConfig};
pub use replication::{DiscoveryConfig, SyncConfig};
pub use storage::{MaintenanceConfig, StorageConfig};

use std::{
    fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use hyrule_net_transport::HttpTransportConfig;
use hyrule_primitives::{BudgetUnit, PeerRole};
use hyrule_storage::EvictionPolicy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{args::StartArgs, constants::DB_FILE_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the Hyrule node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl NodeConfig {
    /// Load the configuration from `path`, or the defaults if it does not
    /// exist. Nothing is written.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load the configuration from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save the configuration to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    /// Check the values no default can fix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.network.port == 0 {
            return invalid("port must be non-zero");
        }
        if self.storage.capacity.limit() == 0 {
            return invalid("storage capacity must be greater than 0");
        }
        if self.network.anchor && self.network.anchor_addr.is_some() {
            return invalid("an anchor does not bootstrap from another anchor");
        }
        if self.proxy.enabled && self.proxy.addr.trim().is_empty() {
            return invalid("proxy enabled but no proxy address configured");
        }
        if self.network.request_timeout_secs == 0 {
            return invalid("request timeout must be non-zero");
        }
        if self.discovery.interval_secs == 0 || self.sync.interval_secs == 0 {
            return invalid("round intervals must be non-zero");
        }
        if self.maintenance.verify_interval_secs == 0 || self.maintenance.monitor_interval_secs == 0
        {
            return invalid("maintenance intervals must be non-zero");
        }
        if self.discovery.fanout == 0 {
            return invalid("discovery fanout must be at least 1");
        }
        if self.sync.max_concurrent_transfers == 0 || self.sync.max_concurrent_peers == 0 {
            return invalid("sync concurrency limits must be at least 1");
        }
        Ok(())
    }

    /// Apply command line arguments to override the configuration.
    pub fn apply_args(&mut self, args: &StartArgs) {
        let StartArgs {
            network,
            storage,
            discovery,
            sync,
            proxy,
        } = args;

        if let Some(port) = network.port {
            self.network.port = port;
        }
        if let Some(addr) = network.addr {
            self.network.addr = addr;
        }
        if let Some(advertise) = &network.advertise_addr {
            self.network.advertise_addr = Some(advertise.clone());
        }
        if network.anchor {
            self.network.anchor = true;
            self.network.anchor_addr = None;
        }
        if let Some(anchor_addr) = &network.anchor_addr {
            self.network.anchor_addr = Some(anchor_addr.clone());
        }
        if let Some(secs) = network.request_timeout {
            self.network.request_timeout_secs = secs;
        }

        if let Some(path) = &storage.storage_path {
            self.storage.path = path.clone();
        }
        if let Some(capacity) = storage.capacity {
            self.storage.capacity = capacity;
        }
        if storage.memory {
            self.storage.memory = true;
        }

        if let Some(secs) = discovery.interval {
            self.discovery.interval_secs = secs;
        }
        if let Some(fanout) = discovery.fanout {
            self.discovery.fanout = fanout;
        }
        if let Some(secs) = discovery.liveness_timeout {
            self.discovery.liveness_timeout_secs = secs;
        }

        if let Some(secs) = sync.interval {
            self.sync.interval_secs = secs;
        }
        if let Some(max) = sync.max_concurrent_transfers {
            self.sync.max_concurrent_transfers = max;
        }
        if let Some(max) = sync.max_concurrent_peers {
            self.sync.max_concurrent_peers = max;
        }
        if sync.evict_for_replication {
            self.sync.evict_for_replication = true;
        }

        if proxy.enable_proxy {
            self.proxy.enabled = true;
        }
        if let Some(addr) = &proxy.proxy_addr {
            self.proxy.addr = addr.clone();
        }
    }

    pub fn role(&self) -> PeerRole {
        if self.network.anchor {
            PeerRole::Anchor
        } else {
            PeerRole::Peer
        }
    }

    /// Socket the HTTP server binds.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.addr, self.network.port)
    }

    /// Address peers reach this node at. Also the source of the node id.
    pub fn advertise_addr(&self) -> String {
        self.network
            .advertise_addr
            .clone()
            .unwrap_or_else(|| format!("127.0.0.1:{}", self.network.port))
    }

    /// Object database file, unless running in memory.
    pub fn db_path(&self) -> Option<PathBuf> {
        (!self.storage.memory).then(|| self.storage.path.join(DB_FILE_NAME))
    }

    pub fn discovery_config(&self) -> hyrule_net_discovery::DiscoveryConfig {
        hyrule_net_discovery::DiscoveryConfig {
            interval: Duration::from_secs(self.discovery.interval_secs),
            fanout: self.discovery.fanout,
            liveness_timeout: Duration::from_secs(self.discovery.liveness_timeout_secs),
            anchor_addr: if self.network.anchor {
                None
            } else {
                self.network.anchor_addr.clone()
            },
        }
    }

    pub fn sync_config(&self) -> hyrule_sync::SyncConfig {
        hyrule_sync::SyncConfig {
            interval: Duration::from_secs(self.sync.interval_secs),
            max_concurrent_transfers: self.sync.max_concurrent_transfers,
            max_concurrent_peers: self.sync.max_concurrent_peers,
            eviction: self.replication_eviction(),
        }
    }

    /// Policy for objects arriving from peers.
    pub fn replication_eviction(&self) -> EvictionPolicy {
        if self.sync.evict_for_replication {
            EvictionPolicy::Lru
        } else {
            EvictionPolicy::Never
        }
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            proxy: self.proxy.enabled.then(|| self.proxy.addr.clone()),
            request_timeout: Duration::from_secs(self.network.request_timeout_secs),
        }
    }

    /// Human-readable capacity, in GB for byte budgets.
    pub fn capacity_summary(&self) -> String {
        let capacity = self.storage.capacity;
        match capacity.unit() {
            BudgetUnit::Objects => capacity.to_string(),
            BudgetUnit::Bytes => {
                format!("{:.2} GB", capacity.limit() as f64 / (1024.0 * 1024.0 * 1024.0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hyrule_primitives::CapacityBudget;

    use super::*;
    use crate::args::{NetworkArgs, ProxyArgs, StorageArgs, SyncArgs};

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        config.validate().unwrap();

        assert_eq!(config.network.port, 8080);
        assert_eq!(config.storage.capacity, CapacityBudget::gib(10));
        assert_eq!(config.proxy.addr, "127.0.0.1:9050");
        assert_eq!(config.role(), PeerRole::Peer);
        assert_eq!(config.replication_eviction(), EvictionPolicy::Never);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/hyrule-node.toml");
        let mut config = NodeConfig::default();
        config.network.anchor = true;
        config.storage.capacity = CapacityBudget::objects(500);

        config.save(&path).unwrap();
        let loaded = NodeConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("capacity = \"500objects\""));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(
            &path,
            "[network]\nport = 9000\nanchor_addr = \"anchor.onion:80\"\n\n[storage]\ncapacity = \"512MiB\"\n",
        )
        .unwrap();

        let config = NodeConfig::load(&path).unwrap();

        assert_eq!(config.network.port, 9000);
        assert_eq!(config.storage.capacity, CapacityBudget::bytes(512 * 1024 * 1024));
        assert_eq!(config.sync, SyncConfig::default());
        assert_eq!(
            config.discovery_config().anchor_addr.as_deref(),
            Some("anchor.onion:80")
        );
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[storage]\ncapacity = \"lots\"\n").unwrap();

        let err = NodeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = NodeConfig::default();
        config.network.anchor_addr = Some("anchor:8080".into());

        config.apply_args(&StartArgs {
            network: NetworkArgs {
                port: Some(9999),
                ..Default::default()
            },
            storage: StorageArgs {
                capacity: Some(CapacityBudget::objects(3)),
                memory: true,
                ..Default::default()
            },
            sync: SyncArgs {
                evict_for_replication: true,
                ..Default::default()
            },
            proxy: ProxyArgs {
                enable_proxy: true,
                proxy_addr: None,
            },
            ..Default::default()
        });

        assert_eq!(config.network.port, 9999);
        assert_eq!(config.network.anchor_addr.as_deref(), Some("anchor:8080"));
        assert_eq!(config.storage.capacity, CapacityBudget::objects(3));
        assert_eq!(config.db_path(), None);
        assert_eq!(config.sync_config().eviction, EvictionPolicy::Lru);
        assert_eq!(config.transport_config().proxy.as_deref(), Some("127.0.0.1:9050"));
    }

    #[test]
    fn test_anchor_flag_clears_anchor_addr() {
        let mut config = NodeConfig::default();
        config.network.anchor_addr = Some("anchor:8080".into());

        config.apply_args(&StartArgs {
            network: NetworkArgs {
                anchor: true,
                ..Default::default()
            },
            ..Default::default()
        });

        assert_eq!(config.role(), PeerRole::Anchor);
        assert!(config.discovery_config().anchor_addr.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects() {
        let cases: [fn(&mut NodeConfig); 5] = [
            |c| c.network.port = 0,
            |c| c.storage.capacity = CapacityBudget::bytes(0),
            |c| {
                c.network.anchor = true;
                c.network.anchor_addr = Some("a:1".into());
            },
            |c| {
                c.proxy.enabled = true;
                c.proxy.addr = " ".into();
            },
            |c| c.sync.max_concurrent_peers = 0,
        ];

        for mutate in cases {
            let mut config = NodeConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_advertise_addr() {
        let mut config = NodeConfig::default();
        assert_eq!(config.advertise_addr(), "127.0.0.1:8080");

        config.network.advertise_addr = Some("abc.onion:80".into());
        assert_eq!(config.advertise_addr(), "abc.onion:80");
    }
}
