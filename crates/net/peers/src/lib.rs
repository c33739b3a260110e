//! Membership of the storage cluster.
//!
//! [`MembershipTable`] holds at most one [`PeerInfo`](hyrule_primitives::PeerInfo)
//! per peer id, including the local node's own entry. Mutations are
//! serialized behind a single lock and announced on a broadcast channel.

mod events;
mod table;

pub use events::{EventEmitter, PeerEvent};
pub use table::{MembershipTable, MergeOutcome};
