//! HTTP round trips over a loopback listener.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use hyrule_net_transport::{
    FetchResponse, HandshakeResponse, HttpTransport, HttpTransportConfig, PeerService,
    PeerTransport, PushResponse, RejectReason, TransportError, TransportResult,
};
use hyrule_primitives::{
    CapacityBudget, Fingerprint, PeerInfo, PeerRole, RepositoryManifest, RepositoryObject,
};
use hyrule_rpc_server::{
    NodeApi, NodeStatus, PutObjectResponse, RepoObjects, RepoSummary, RpcServer,
};
use hyrule_storage::{ContentStore, MemoryBackend};
use tokio_util::sync::CancellationToken;

struct TestNode {
    info: PeerInfo,
    store: Arc<ContentStore>,
}

impl NodeApi for TestNode {
    fn status(&self) -> NodeStatus {
        let stats = self.store.stats();
        NodeStatus {
            node_id: self.info.id,
            address: self.info.address.clone(),
            role: self.info.role,
            version: "test".into(),
            uptime_secs: 0,
            peer_count: 0,
            objects: stats.objects,
            bytes_used: stats.bytes,
            capacity: stats.budget,
            percent_used: stats.percent_used(),
            manifest_version: stats.manifest_version,
            proxy_enabled: false,
            peers: Vec::new(),
        }
    }

    fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }
}

#[async_trait]
impl PeerService for TestNode {
    async fn handshake(&self, remote: PeerInfo) -> TransportResult<HandshakeResponse> {
        if remote.address.is_empty() {
            return Err(TransportError::Remote {
                addr: String::new(),
                message: "empty address".into(),
            });
        }
        Ok(HandshakeResponse {
            info: self.info.clone(),
            peers: vec![self.info.clone(), remote],
        })
    }

    async fn manifest(&self) -> TransportResult<RepositoryManifest> {
        Ok(self.store.manifest())
    }

    async fn fetch(&self, fingerprint: Fingerprint) -> TransportResult<FetchResponse> {
        Ok(match self.store.get(&fingerprint) {
            Ok(Some(object)) => FetchResponse::Found(object),
            _ => FetchResponse::NotFound,
        })
    }

    async fn push(&self, object: RepositoryObject) -> TransportResult<PushResponse> {
        Ok(match self.store.put(object) {
            Ok(_) => PushResponse::Accepted,
            Err(_) => PushResponse::Rejected(RejectReason::CapacityExceeded),
        })
    }
}

struct Harness {
    addr: String,
    node: Arc<TestNode>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
}

async fn start() -> Harness {
    let listener = RpcServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let budget = CapacityBudget::objects(10);
    let node = Arc::new(TestNode {
        info: PeerInfo::new(addr.clone(), PeerRole::Anchor, budget),
        store: Arc::new(ContentStore::open(MemoryBackend::new(), budget).unwrap()),
    });

    let shutdown = CancellationToken::new();
    let server = RpcServer::new(node.clone(), node.clone());
    let token = shutdown.clone();
    let server = tokio::spawn(async move {
        server.serve(listener, token).await.unwrap();
    });

    Harness {
        addr,
        node,
        shutdown,
        server,
    }
}

impl Harness {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.server)
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn test_status_api() {
    let harness = start().await;
    let client = reqwest::Client::new();

    let health = client.get(harness.url("/health")).send().await.unwrap();
    assert!(health.status().is_success());

    let put = client
        .post(harness.url("/repos/demo/objects?path=README.md"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(put.status().as_u16(), 201);
    let put: PutObjectResponse = serde_json::from_str(&put.text().await.unwrap()).unwrap();
    assert!(put.stored);

    let again = client
        .post(harness.url("/repos/demo/objects?path=README.md"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 200);

    let status = client.get(harness.url("/status")).send().await.unwrap();
    let status: NodeStatus = serde_json::from_str(&status.text().await.unwrap()).unwrap();
    assert_eq!(status.objects, 1);
    assert_eq!(status.role, PeerRole::Anchor);

    let repos = client.get(harness.url("/repos")).send().await.unwrap();
    let repos: Vec<RepoSummary> = serde_json::from_str(&repos.text().await.unwrap()).unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!((repos[0].repo.as_str(), repos[0].objects), ("demo", 1));

    let listed = client.get(harness.url("/repos/demo/objects")).send().await.unwrap();
    let listed: RepoObjects = serde_json::from_str(&listed.text().await.unwrap()).unwrap();
    assert_eq!(listed.fingerprints, vec![put.fingerprint]);

    let object_url = harness.url(&format!("/objects/{}", put.fingerprint));
    let payload = client.get(&object_url).send().await.unwrap();
    assert_eq!(payload.headers()["x-hyrule-path"], "README.md");
    assert_eq!(payload.bytes().await.unwrap().as_ref(), b"hello");

    let deleted = client.delete(&object_url).send().await.unwrap();
    assert_eq!(deleted.status().as_u16(), 204);
    let gone = client.get(&object_url).send().await.unwrap();
    assert_eq!(gone.status().as_u16(), 404);

    harness.stop().await;
}

#[tokio::test]
async fn test_bad_requests() {
    let harness = start().await;
    let client = reqwest::Client::new();

    let no_path = client
        .post(harness.url("/repos/demo/objects"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(no_path.status().as_u16(), 400);

    let bad_fp = client.get(harness.url("/objects/nothex")).send().await.unwrap();
    assert_eq!(bad_fp.status().as_u16(), 400);

    let bad_body = client
        .post(harness.url("/peer/objects"))
        .body(vec![0xff, 0xff, 0xff])
        .send()
        .await
        .unwrap();
    assert_eq!(bad_body.status().as_u16(), 400);

    harness.stop().await;
}

#[tokio::test]
async fn test_peer_protocol_over_http() {
    let harness = start().await;
    let transport = HttpTransport::new(&HttpTransportConfig::default()).unwrap();
    let object = RepositoryObject::new("demo", "a.txt", &b"payload"[..], 1);
    let fingerprint = object.fingerprint();

    let me = PeerInfo::new("127.0.0.1:1", PeerRole::Peer, CapacityBudget::objects(1));
    let handshake = transport.handshake(&harness.addr, me.clone()).await.unwrap();
    assert_eq!(handshake.info.id, harness.node.info.id);
    assert!(handshake.peers.contains(&me));

    let pushed = transport.push_object(&harness.addr, object.clone()).await.unwrap();
    assert_eq!(pushed, PushResponse::Accepted);

    let manifest = transport.get_manifest(&harness.addr).await.unwrap();
    assert!(manifest.contains(object.repo(), &fingerprint));

    let fetched = transport.fetch_object(&harness.addr, fingerprint).await.unwrap();
    assert_eq!(fetched, FetchResponse::Found(object));

    let missing = Fingerprint::of("demo", "missing", b"");
    let fetched = transport.fetch_object(&harness.addr, missing).await.unwrap();
    assert_eq!(fetched, FetchResponse::NotFound);

    let anonymous = PeerInfo::new("", PeerRole::Peer, CapacityBudget::objects(1));
    let err = transport.handshake(&harness.addr, anonymous).await.unwrap_err();
    assert!(matches!(err, TransportError::Remote { .. }));

    harness.stop().await;
}
