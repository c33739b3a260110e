//! Sync error types.

use hyrule_net_transport::TransportError;
use hyrule_primitives::PeerId;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The peer's manifest could not be retrieved.
    #[error("manifest request to {peer} failed: {source}")]
    Manifest {
        peer: PeerId,
        #[source]
        source: TransportError,
    },

    /// A sync with this peer is already running.
    #[error("sync with {0} already in progress")]
    InProgress(PeerId),
}
