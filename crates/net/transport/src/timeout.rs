//! Per-call deadline for any transport.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use hyrule_primitives::{Fingerprint, PeerInfo, RepositoryManifest, RepositoryObject};

use crate::{
    FetchResponse, HandshakeResponse, PeerTransport, PushResponse, TransportError,
    TransportResult,
};

/// Wraps a transport so that every call fails with
/// [`TransportError::Timeout`] once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct TimeoutTransport<T> {
    inner: T,
    timeout: Duration,
}

impl<T> TimeoutTransport<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn bounded<R>(
        &self,
        addr: &str,
        fut: impl Future<Output = TransportResult<R>>,
    ) -> TransportResult<R> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Timeout {
                    addr: addr.to_owned(),
                    after: self.timeout,
                })
            })
    }
}

#[async_trait]
impl<T: PeerTransport> PeerTransport for TimeoutTransport<T> {
    async fn handshake(&self, addr: &str, local: PeerInfo) -> TransportResult<HandshakeResponse> {
        self.bounded(addr, self.inner.handshake(addr, local)).await
    }

    async fn get_manifest(&self, addr: &str) -> TransportResult<RepositoryManifest> {
        self.bounded(addr, self.inner.get_manifest(addr)).await
    }

    async fn fetch_object(
        &self,
        addr: &str,
        fingerprint: Fingerprint,
    ) -> TransportResult<FetchResponse> {
        self.bounded(addr, self.inner.fetch_object(addr, fingerprint))
            .await
    }

    async fn push_object(
        &self,
        addr: &str,
        object: RepositoryObject,
    ) -> TransportResult<PushResponse> {
        self.bounded(addr, self.inner.push_object(addr, object)).await
    }
}
