//! The parts of a running node and its status snapshot.

use std::{sync::Arc, time::Instant};

use hyrule_net_discovery::DiscoveryService;
use hyrule_net_peers::MembershipTable;
use hyrule_node_core::constants::VERSION;
use hyrule_primitives::PeerInfo;
use hyrule_rpc_server::{NodeApi, NodeStatus, PeerStatus};
use hyrule_storage::ContentStore;
use hyrule_sync::SyncEngine;

/// Shared handles to everything a node runs.
#[derive(Debug)]
pub struct NodeComponents {
    /// Our own entry as advertised to peers.
    pub local: PeerInfo,
    pub store: Arc<ContentStore>,
    pub table: Arc<MembershipTable>,
    pub discovery: Arc<DiscoveryService>,
    pub sync: Arc<SyncEngine>,
    pub(crate) proxy_enabled: bool,
    pub(crate) started_at: Instant,
}

impl NodeComponents {
    pub fn proxy_enabled(&self) -> bool {
        self.proxy_enabled
    }
}

impl NodeApi for NodeComponents {
    fn status(&self) -> NodeStatus {
        let stats = self.store.stats();
        let states = self.sync.states();
        let peers: Vec<PeerStatus> = self
            .table
            .remote_peers()
            .into_iter()
            .map(|peer| PeerStatus {
                sync_state: states.get(&peer.id).copied().unwrap_or_default().to_string(),
                id: peer.id,
                address: peer.address,
                role: peer.role,
                last_seen: peer.last_seen,
                manifest_version: peer.manifest_version,
            })
            .collect();

        NodeStatus {
            node_id: self.local.id,
            address: self.local.address.clone(),
            role: self.local.role,
            version: VERSION.to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            peer_count: peers.len(),
            objects: stats.objects,
            bytes_used: stats.bytes,
            percent_used: stats.percent_used(),
            capacity: stats.budget,
            manifest_version: stats.manifest_version,
            proxy_enabled: self.proxy_enabled,
            peers,
        }
    }

    fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }
}
