//! Peer identity and membership records.

use serde::{Deserialize, Serialize};

use crate::{CapacityBudget, fingerprint::impl_hash_newtype};

/// Identifier of a peer, derived from its advertised address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId([u8; 32]);

impl_hash_newtype!(PeerId);

impl PeerId {
    /// Derive the id for a peer advertising `address`.
    pub fn from_address(address: &str) -> Self {
        Self(*blake3::hash(address.as_bytes()).as_bytes())
    }
}

/// Role a node plays in the cluster.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PeerRole {
    /// Well-known bootstrap node.
    Anchor,
    #[default]
    Peer,
}

impl PeerRole {
    pub const fn is_anchor(&self) -> bool {
        matches!(self, Self::Anchor)
    }
}

/// What a node knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    /// Address the peer is reachable at (`host:port`, possibly `.onion`).
    pub address: String,
    pub role: PeerRole,
    /// Unix millis of the last successful contact.
    pub last_seen: u64,
    /// Capacity the peer advertises.
    pub capacity: CapacityBudget,
    /// Manifest version observed during the last sync with this peer.
    pub manifest_version: u64,
}

impl PeerInfo {
    pub fn new(address: impl Into<String>, role: PeerRole, capacity: CapacityBudget) -> Self {
        let address = address.into();
        Self {
            id: PeerId::from_address(&address),
            address,
            role,
            last_seen: 0,
            capacity,
            manifest_version: 0,
        }
    }

    pub fn with_last_seen(mut self, last_seen: u64) -> Self {
        self.last_seen = last_seen;
        self
    }

    /// Whether the id matches the advertised address.
    pub fn is_consistent(&self) -> bool {
        self.id == PeerId::from_address(&self.address)
    }
}
