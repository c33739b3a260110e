//! In-process network for multi-node tests.
//!
//! Nodes register a [`PeerService`] under their address; [`MemoryNetwork`]
//! routes [`PeerTransport`] calls straight to it. Addresses can be made
//! unreachable and individual object fetches can be made to fail, which is
//! how partial failures are exercised.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use hyrule_primitives::{Fingerprint, PeerInfo, RepositoryManifest, RepositoryObject};
use parking_lot::RwLock;

use crate::{
    FetchResponse, HandshakeResponse, PeerService, PeerTransport, PushResponse, TransportError,
    TransportResult,
};

#[derive(Default)]
struct Inner {
    services: HashMap<String, Arc<dyn PeerService>>,
    unreachable: HashSet<String>,
    failing_fetches: HashSet<Fingerprint>,
}

/// Shared in-memory routing table. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<RwLock<Inner>>,
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryNetwork")
            .field("nodes", &inner.services.len())
            .field("unreachable", &inner.unreachable.len())
            .finish()
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route calls for `addr` to `service`, replacing any previous one.
    pub fn register(&self, addr: impl Into<String>, service: Arc<dyn PeerService>) {
        self.inner.write().services.insert(addr.into(), service);
    }

    pub fn unregister(&self, addr: &str) {
        self.inner.write().services.remove(addr);
    }

    /// Make calls to `addr` fail with [`TransportError::Unreachable`].
    pub fn set_unreachable(&self, addr: &str, unreachable: bool) {
        let mut inner = self.inner.write();
        if unreachable {
            inner.unreachable.insert(addr.to_owned());
        } else {
            inner.unreachable.remove(addr);
        }
    }

    /// Make every fetch of `fingerprint` fail, from any node.
    pub fn fail_fetches_of(&self, fingerprint: Fingerprint) {
        self.inner.write().failing_fetches.insert(fingerprint);
    }

    pub fn clear_fetch_failures(&self) {
        self.inner.write().failing_fetches.clear();
    }

    fn route(&self, addr: &str) -> TransportResult<Arc<dyn PeerService>> {
        let inner = self.inner.read();
        if inner.unreachable.contains(addr) {
            return Err(TransportError::Unreachable(addr.to_owned()));
        }
        inner
            .services
            .get(addr)
            .cloned()
            .ok_or_else(|| TransportError::Unreachable(addr.to_owned()))
    }
}

#[async_trait]
impl PeerTransport for MemoryNetwork {
    async fn handshake(&self, addr: &str, local: PeerInfo) -> TransportResult<HandshakeResponse> {
        self.route(addr)?.handshake(local).await
    }

    async fn get_manifest(&self, addr: &str) -> TransportResult<RepositoryManifest> {
        self.route(addr)?.manifest().await
    }

    async fn fetch_object(
        &self,
        addr: &str,
        fingerprint: Fingerprint,
    ) -> TransportResult<FetchResponse> {
        let service = self.route(addr)?;
        if self.inner.read().failing_fetches.contains(&fingerprint) {
            return Err(TransportError::TransportFailure(format!(
                "injected failure fetching {fingerprint}"
            )));
        }
        service.fetch(fingerprint).await
    }

    async fn push_object(
        &self,
        addr: &str,
        object: RepositoryObject,
    ) -> TransportResult<PushResponse> {
        self.route(addr)?.push(object).await
    }
}

#[cfg(test)]
mod tests {
    use hyrule_primitives::{CapacityBudget, PeerRole};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Echo {
        pushed: Mutex<Vec<Fingerprint>>,
    }

    #[async_trait]
    impl PeerService for Echo {
        async fn handshake(&self, remote: PeerInfo) -> TransportResult<HandshakeResponse> {
            Ok(HandshakeResponse {
                info: remote.clone(),
                peers: vec![remote],
            })
        }

        async fn manifest(&self) -> TransportResult<RepositoryManifest> {
            Ok(RepositoryManifest::new())
        }

        async fn fetch(&self, _fingerprint: Fingerprint) -> TransportResult<FetchResponse> {
            Ok(FetchResponse::NotFound)
        }

        async fn push(&self, object: RepositoryObject) -> TransportResult<PushResponse> {
            self.pushed.lock().push(object.fingerprint());
            Ok(PushResponse::Accepted)
        }
    }

    #[tokio::test]
    async fn test_routes_to_registered_service() {
        let network = MemoryNetwork::new();
        let echo = Arc::new(Echo::default());
        network.register("a:1", echo.clone());

        let me = PeerInfo::new("me:1", PeerRole::Peer, CapacityBudget::objects(1));
        let response = network.handshake("a:1", me.clone()).await.unwrap();
        assert_eq!(response.info, me);

        let object = RepositoryObject::new("r", "p", &b"x"[..], 0);
        let pushed = network.push_object("a:1", object.clone()).await.unwrap();
        assert_eq!(pushed, PushResponse::Accepted);
        assert_eq!(*echo.pushed.lock(), vec![object.fingerprint()]);
    }

    #[tokio::test]
    async fn test_unknown_and_unreachable() {
        let network = MemoryNetwork::new();
        network.register("a:1", Arc::new(Echo::default()));

        assert!(matches!(
            network.get_manifest("b:1").await,
            Err(TransportError::Unreachable(_))
        ));

        network.set_unreachable("a:1", true);
        assert!(network.get_manifest("a:1").await.is_err());
        network.set_unreachable("a:1", false);
        assert!(network.get_manifest("a:1").await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_fetch_failure() {
        let network = MemoryNetwork::new();
        network.register("a:1", Arc::new(Echo::default()));
        let fp = Fingerprint::new([1; 32]);

        network.fail_fetches_of(fp);
        assert!(network.fetch_object("a:1", fp).await.is_err());
        assert_eq!(
            network.fetch_object("a:1", Fingerprint::new([2; 32])).await.unwrap(),
            FetchResponse::NotFound
        );

        network.clear_fetch_failures();
        assert!(network.fetch_object("a:1", fp).await.is_ok());
    }
}
