//! Core primitive types for the Hyrule storage node.
//!
//! Everything here is plain data shared by the store, the membership table,
//! the discovery and sync protocols and the HTTP surface.
//!
//! # Types
//!
//! ## Content
//! - [`Fingerprint`] - BLAKE3 content identity of a repository object
//! - [`RepoId`] - Identifier of the repository owning an object
//! - [`RepositoryObject`] - Immutable, fingerprinted unit of stored content
//! - [`RepositoryManifest`], [`RepoManifest`] - Per-node projection of which
//!   objects exist for which repository
//!
//! ## Peers
//! - [`PeerId`] - Identifier derived from a peer's advertised address
//! - [`PeerRole`] - `anchor` or `peer`
//! - [`PeerInfo`] - Membership record exchanged during discovery
//!
//! ## Capacity
//! - [`CapacityBudget`], [`BudgetUnit`] - Store ceiling in objects or bytes

mod budget;
mod fingerprint;
mod manifest;
mod object;
mod peer;
mod time;

pub use budget::{BudgetParseError, BudgetUnit, CapacityBudget};
pub use fingerprint::{Fingerprint, FingerprintParseError};
pub use manifest::{RepoManifest, RepositoryManifest};
pub use object::{RepoId, RepositoryObject};
pub use peer::{PeerId, PeerInfo, PeerRole};
pub use time::unix_millis;
