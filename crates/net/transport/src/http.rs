//! Peer protocol over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use hyrule_primitives::{Fingerprint, PeerInfo, RepositoryManifest, RepositoryObject};
use reqwest::{Client, Proxy, RequestBuilder, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, trace};

use crate::{
    FetchResponse, HandshakeRequest, HandshakeResponse, PeerTransport, PushResponse,
    TransportError, TransportResult,
    protocol::{self, HANDSHAKE_PATH, MANIFEST_PATH, OBJECTS_PATH},
};

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// SOCKS5 proxy (`host:port`) all requests are routed through.
    pub proxy: Option<String>,
    /// Deadline enforced by the HTTP client itself.
    pub request_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Postcard-over-HTTP client.
///
/// With a proxy configured, requests go through `socks5h://` so hostnames
/// (including `.onion`) are resolved by the proxy, not locally.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    proxied: bool,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> TransportResult<Self> {
        let mut builder = Client::builder().timeout(config.request_timeout);

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(format!("socks5h://{proxy}"))?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder.build()?;
        debug!(proxied = config.proxy.is_some(), "Built HTTP peer transport");
        Ok(Self {
            client,
            proxied: config.proxy.is_some(),
        })
    }

    pub fn is_proxied(&self) -> bool {
        self.proxied
    }

    /// `http://{addr}{path}`, unless `addr` already carries a scheme.
    pub fn url(addr: &str, path: &str) -> String {
        let base = addr.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{base}{path}")
        } else {
            format!("http://{base}{path}")
        }
    }

    async fn send<R: DeserializeOwned>(
        &self,
        addr: &str,
        request: RequestBuilder,
    ) -> TransportResult<R> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(TransportError::Remote {
                addr: addr.to_owned(),
                message: format!("{status}: {}", String::from_utf8_lossy(&body)),
            });
        }

        trace!(%addr, len = body.len(), "Received peer response");
        Ok(postcard::from_bytes(&body)?)
    }

    async fn get<R: DeserializeOwned>(&self, addr: &str, path: &str) -> TransportResult<R> {
        let request = self.client.get(Self::url(addr, path));
        self.send(addr, request).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        addr: &str,
        path: &str,
        body: &B,
    ) -> TransportResult<R> {
        let request = self
            .client
            .post(Self::url(addr, path))
            .header(CONTENT_TYPE, protocol::CONTENT_TYPE)
            .body(postcard::to_allocvec(body)?);
        self.send(addr, request).await
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn handshake(&self, addr: &str, local: PeerInfo) -> TransportResult<HandshakeResponse> {
        self.post(addr, HANDSHAKE_PATH, &HandshakeRequest { info: local })
            .await
    }

    async fn get_manifest(&self, addr: &str) -> TransportResult<RepositoryManifest> {
        self.get(addr, MANIFEST_PATH).await
    }

    async fn fetch_object(
        &self,
        addr: &str,
        fingerprint: Fingerprint,
    ) -> TransportResult<FetchResponse> {
        self.get(addr, &protocol::object_path(&fingerprint)).await
    }

    async fn push_object(
        &self,
        addr: &str,
        object: RepositoryObject,
    ) -> TransportResult<PushResponse> {
        self.post(addr, OBJECTS_PATH, &object).await
    }
}
