//! Wire messages and HTTP paths of the peer protocol.
//!
//! Bodies are postcard-encoded in both directions.

use std::fmt;

use hyrule_primitives::{Fingerprint, PeerInfo, RepositoryObject};
use serde::{Deserialize, Serialize};

/// Content type of every peer request and response body.
pub const CONTENT_TYPE: &str = "application/postcard";

/// `POST`: [`HandshakeRequest`] -> [`HandshakeResponse`].
pub const HANDSHAKE_PATH: &str = "/peer/handshake";
/// `GET`: -> [`RepositoryManifest`](hyrule_primitives::RepositoryManifest).
pub const MANIFEST_PATH: &str = "/peer/manifest";
/// `POST`: [`RepositoryObject`] -> [`PushResponse`].
/// `GET {OBJECTS_PATH}/{fingerprint}`: -> [`FetchResponse`].
pub const OBJECTS_PATH: &str = "/peer/objects";

/// Path for fetching one object.
pub fn object_path(fingerprint: &Fingerprint) -> String {
    format!("{OBJECTS_PATH}/{fingerprint}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// The requester's own entry.
    pub info: PeerInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// The responder's own entry.
    pub info: PeerInfo,
    /// The responder's membership table, ordered by peer id.
    pub peers: Vec<PeerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchResponse {
    Found(RepositoryObject),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushResponse {
    Accepted,
    Rejected(RejectReason),
}

/// Why a peer refused a pushed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Larger than the receiver's whole budget.
    CapacityExceeded,
    /// Does not fit in the receiver's free space.
    InsufficientSpace,
    /// Fingerprint does not match content.
    InvalidObject,
    StorageFailure(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => f.write_str("capacity exceeded"),
            Self::InsufficientSpace => f.write_str("insufficient space"),
            Self::InvalidObject => f.write_str("invalid object"),
            Self::StorageFailure(msg) => write!(f, "storage failure: {msg}"),
        }
    }
}
