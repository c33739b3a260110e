//! Peer discovery.
//!
//! A node either is the anchor, answering handshakes without bootstrapping,
//! or points at one. Every round a node refreshes its own entry, bootstraps
//! against the anchor while it has nobody else to talk to, handshakes a
//! random subset of known peers and merges what they return, then expires
//! peers it has not heard about within the liveness timeout.
//!
//! Failed handshakes are logged and left for the next round; they never
//! remove a peer.

mod config;
mod error;
mod metrics;
mod service;

pub use config::{DEFAULT_FANOUT, DiscoveryConfig};
pub use error::DiscoveryError;
pub use service::{DiscoveryService, ManifestVersionSource, RoundReport};
