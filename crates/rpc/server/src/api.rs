//! Types served by the status API.

use std::sync::Arc;

use hyrule_primitives::{
    CapacityBudget, Fingerprint, PeerId, PeerRole, RepoId, RepositoryManifest,
};
use hyrule_storage::ContentStore;
use serde::{Deserialize, Serialize};

/// What the status API needs from a running node.
pub trait NodeApi: Send + Sync {
    fn status(&self) -> NodeStatus;

    fn store(&self) -> &Arc<ContentStore>;
}

/// `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node_id: PeerId,
    pub address: String,
    pub role: PeerRole,
    pub version: String,
    pub uptime_secs: u64,
    /// Known remote peers.
    pub peer_count: usize,
    pub objects: usize,
    pub bytes_used: u64,
    pub capacity: CapacityBudget,
    pub percent_used: f64,
    pub manifest_version: u64,
    pub proxy_enabled: bool,
    pub peers: Vec<PeerStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStatus {
    pub id: PeerId,
    pub address: String,
    pub role: PeerRole,
    pub last_seen: u64,
    pub manifest_version: u64,
    pub sync_state: String,
}

/// One entry of `GET /repos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub repo: RepoId,
    pub objects: usize,
    pub version: u64,
}

impl RepoSummary {
    /// Summaries of every repository in `manifest` that holds objects,
    /// ordered by id.
    pub fn from_manifest(manifest: &RepositoryManifest) -> Vec<Self> {
        manifest
            .non_empty_repos()
            .map(|(repo, entry)| Self {
                repo: repo.clone(),
                objects: entry.objects.len(),
                version: entry.version,
            })
            .collect()
    }
}

/// `GET /repos/{repo}/objects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoObjects {
    pub repo: RepoId,
    pub fingerprints: Vec<Fingerprint>,
}

/// `POST /repos/{repo}/objects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutObjectResponse {
    pub fingerprint: Fingerprint,
    /// `false` if the object was already stored.
    pub stored: bool,
    /// Objects evicted to make room.
    pub evicted: Vec<Fingerprint>,
}
