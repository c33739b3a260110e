//! Capacity-bounded, eviction-aware storage of repository objects.
//!
//! - [`ContentStore`] - recency index, budget enforcement and manifest
//! - [`ObjectBackend`] - fingerprint to bytes persistence
//! - [`MemoryBackend`], [`RedbBackend`] - volatile and on-disk backends

mod backend;
mod error;
mod metrics;
mod redb_backend;
mod store;

pub use backend::{MemoryBackend, ObjectBackend};
pub use error::{StoreError, StoreResult};
pub use redb_backend::RedbBackend;
pub use store::{
    ContentStore, DeleteOutcome, EvictionPolicy, PutOutcome, StoreStats, VerifyReport,
};
