//! Outbound and inbound sides of the peer protocol.

use async_trait::async_trait;
use hyrule_primitives::{Fingerprint, PeerInfo, RepositoryManifest, RepositoryObject};

use crate::{FetchResponse, HandshakeResponse, PushResponse, TransportResult};

/// Client side: issue protocol requests to a peer at an address.
///
/// Implementations do not retry. Callers own retry policy.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Exchange membership: send our entry, receive theirs and their table.
    async fn handshake(&self, addr: &str, local: PeerInfo) -> TransportResult<HandshakeResponse>;

    async fn get_manifest(&self, addr: &str) -> TransportResult<RepositoryManifest>;

    async fn fetch_object(
        &self,
        addr: &str,
        fingerprint: Fingerprint,
    ) -> TransportResult<FetchResponse>;

    async fn push_object(
        &self,
        addr: &str,
        object: RepositoryObject,
    ) -> TransportResult<PushResponse>;
}

/// Server side: answer protocol requests from peers.
#[async_trait]
pub trait PeerService: Send + Sync {
    async fn handshake(&self, remote: PeerInfo) -> TransportResult<HandshakeResponse>;

    async fn manifest(&self) -> TransportResult<RepositoryManifest>;

    async fn fetch(&self, fingerprint: Fingerprint) -> TransportResult<FetchResponse>;

    async fn push(&self, object: RepositoryObject) -> TransportResult<PushResponse>;
}
