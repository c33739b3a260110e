//! Inbound side of the peer protocol.

use std::sync::Arc;

use async_trait::async_trait;
use hyrule_net_discovery::{DiscoveryError, DiscoveryService};
use hyrule_net_transport::{
    FetchResponse, HandshakeResponse, PeerService, PushResponse, RejectReason, TransportError,
    TransportResult,
};
use hyrule_primitives::{Fingerprint, PeerInfo, RepositoryManifest, RepositoryObject};
use hyrule_storage::{ContentStore, EvictionPolicy, PutOutcome, StoreError};
use tracing::{debug, trace, warn};

/// Answers peers from the node's discovery service and store.
#[derive(Debug)]
pub struct NodeService {
    discovery: Arc<DiscoveryService>,
    store: Arc<ContentStore>,
    /// Applied to pushed objects.
    eviction: EvictionPolicy,
}

impl NodeService {
    pub fn new(
        discovery: Arc<DiscoveryService>,
        store: Arc<ContentStore>,
        eviction: EvictionPolicy,
    ) -> Self {
        Self {
            discovery,
            store,
            eviction,
        }
    }
}

fn reject_reason(err: &StoreError) -> RejectReason {
    match err {
        StoreError::CapacityExceeded { .. } => RejectReason::CapacityExceeded,
        StoreError::InsufficientSpace { .. } => RejectReason::InsufficientSpace,
        StoreError::InvalidObject(_) => RejectReason::InvalidObject,
        other => RejectReason::StorageFailure(other.to_string()),
    }
}

#[async_trait]
impl PeerService for NodeService {
    async fn handshake(&self, remote: PeerInfo) -> TransportResult<HandshakeResponse> {
        let addr = remote.address.clone();
        self.discovery
            .handle_handshake(remote)
            .map_err(|err| match err {
                DiscoveryError::Transport(err) => err,
                other => {
                    debug!(%addr, error = %other, "Rejected handshake");
                    TransportError::Remote {
                        addr,
                        message: other.to_string(),
                    }
                }
            })
    }

    async fn manifest(&self) -> TransportResult<RepositoryManifest> {
        Ok(self.store.manifest())
    }

    async fn fetch(&self, fingerprint: Fingerprint) -> TransportResult<FetchResponse> {
        match self.store.blocking(move |store| store.get(&fingerprint)).await {
            Ok(Some(object)) => Ok(FetchResponse::Found(object)),
            Ok(None) => Ok(FetchResponse::NotFound),
            Err(err) => {
                warn!(%fingerprint, error = %err, "Serving object failed");
                Err(TransportError::TransportFailure(err.to_string()))
            }
        }
    }

    async fn push(&self, object: RepositoryObject) -> TransportResult<PushResponse> {
        let fingerprint = object.fingerprint();
        if !object.verify() {
            return Ok(PushResponse::Rejected(RejectReason::InvalidObject));
        }

        let eviction = self.eviction;
        let stored = self
            .store
            .blocking(move |store| store.put_with(object, eviction))
            .await;
        match stored {
            Ok(PutOutcome::Stored { evicted }) => {
                trace!(%fingerprint, evicted = evicted.len(), "Accepted pushed object");
                Ok(PushResponse::Accepted)
            }
            Ok(PutOutcome::AlreadyPresent) => Ok(PushResponse::Accepted),
            Err(err) => {
                debug!(%fingerprint, error = %err, "Rejected pushed object");
                Ok(PushResponse::Rejected(reject_reason(&err)))
            }
        }
    }
}
