//! Replication between peers.
//!
//! Each round the [`SyncEngine`] walks the membership table and, per peer,
//! requests its manifest, builds a [`SyncPlan`] from the per-repository
//! symmetric difference against the local store, and transfers objects in
//! both directions. Content is immutable and fingerprinted, so applying
//! the union on both sides converges without ordering writes.
//!
//! Failures never retry within a round; the next round picks them up.

mod config;
mod engine;
mod error;
mod metrics;
mod plan;
mod state;

pub use config::SyncConfig;
pub use engine::{RoundSummary, SyncEngine, SyncReport};
pub use error::SyncError;
pub use plan::{Direction, SyncPlan, Transfer};
pub use state::PeerSyncState;
