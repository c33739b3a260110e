//! Discovery error types.

use hyrule_net_transport::TransportError;
use hyrule_primitives::PeerId;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The advertised id does not derive from the advertised address.
    #[error("peer {id} does not match address {address}")]
    InvalidPeer { id: PeerId, address: String },

    /// A handshake carried our own id.
    #[error("handshake from own id")]
    SelfHandshake,
}
