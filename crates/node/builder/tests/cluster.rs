//! Multi-node behaviour over the in-memory network.

use std::sync::Arc;

use hyrule_net_transport::{MemoryNetwork, PeerTransport, PushResponse, RejectReason, TransportError};
use hyrule_node_builder::{Node, NodeBuilder};
use hyrule_node_core::NodeConfig;
use hyrule_primitives::{CapacityBudget, PeerId, PeerInfo, PeerRole, RepositoryObject};
use hyrule_rpc_server::NodeApi;

const ANCHOR: &str = "anchor.onion:80";

fn config(addr: &str) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.network.advertise_addr = Some(addr.to_string());
    config.storage.memory = true;
    config.storage.capacity = CapacityBudget::objects(100);
    config
}

fn anchor_config() -> NodeConfig {
    let mut config = config(ANCHOR);
    config.network.anchor = true;
    config
}

fn peer_config(addr: &str) -> NodeConfig {
    let mut config = config(addr);
    config.network.anchor_addr = Some(ANCHOR.to_string());
    config
}

fn start(network: &MemoryNetwork, config: NodeConfig) -> Node {
    let addr = config.advertise_addr();
    let node = NodeBuilder::new(config)
        .with_transport(Arc::new(network.clone()))
        .build()
        .unwrap();
    network.register(addr, node.service());
    node
}

async fn discovery_round(nodes: &[&Node]) {
    for node in nodes {
        node.components().discovery.run_round().await;
    }
}

fn obj(path: &str) -> RepositoryObject {
    RepositoryObject::new("repo", path, path.as_bytes().to_vec(), 1)
}

#[tokio::test]
async fn test_discovery_converges_through_anchor() {
    let network = MemoryNetwork::new();
    let anchor = start(&network, anchor_config());
    let b = start(&network, peer_config("b.onion:80"));
    let c = start(&network, peer_config("c.onion:80"));

    discovery_round(&[&anchor, &b, &c]).await;
    discovery_round(&[&anchor, &b, &c]).await;

    for node in [&anchor, &b, &c] {
        let table = &node.components().table;
        assert_eq!(table.len(), 3, "{} sees {:?}", node.config().advertise_addr(), table.snapshot());
    }
    let anchor_id = PeerId::from_address(ANCHOR);
    assert_eq!(
        b.components().table.get(&anchor_id).unwrap().role,
        PeerRole::Anchor
    );
}

#[tokio::test]
async fn test_sync_converges_and_then_idles() {
    let network = MemoryNetwork::new();
    let anchor = start(&network, anchor_config());
    let b = start(&network, peer_config("b.onion:80"));
    discovery_round(&[&b]).await;

    let (x, y) = (obj("x"), obj("y"));
    anchor.components().store.put(x.clone()).unwrap();
    anchor.components().store.put(y.clone()).unwrap();

    let first = b.components().sync.run_round().await;
    assert_eq!(first.fetched, 2);
    let store = &b.components().store;
    assert!(store.contains(&x.fingerprint()) && store.contains(&y.fingerprint()));

    let second = b.components().sync.run_round().await;
    assert_eq!((second.fetched, second.pushed), (0, 0));
    let second = anchor.components().sync.run_round().await;
    assert_eq!((second.fetched, second.pushed), (0, 0));

    let status = b.components().status();
    assert_eq!(status.objects, 2);
    assert_eq!(status.peer_count, 1);
    assert_eq!(status.peers[0].sync_state, "idle");
    assert_eq!(status.peers[0].manifest_version, anchor.components().store.manifest().version);
}

#[tokio::test]
async fn test_failed_transfer_is_retried_next_round() {
    let network = MemoryNetwork::new();
    let anchor = start(&network, anchor_config());
    let b = start(&network, peer_config("b.onion:80"));
    discovery_round(&[&b]).await;

    let (x, y) = (obj("x"), obj("y"));
    anchor.components().store.put(x.clone()).unwrap();
    anchor.components().store.put(y.clone()).unwrap();
    network.fail_fetches_of(y.fingerprint());

    let round = b.components().sync.run_round().await;
    assert_eq!((round.fetched, round.failed), (1, 1));
    assert!(b.components().store.contains(&x.fingerprint()));
    assert!(!b.components().store.contains(&y.fingerprint()));
    assert_eq!(b.components().status().peers[0].sync_state, "failed");

    network.clear_fetch_failures();
    let round = b.components().sync.run_round().await;
    assert_eq!((round.fetched, round.failed), (1, 0));
    assert!(b.components().store.contains(&y.fingerprint()));
}

#[tokio::test]
async fn test_unreachable_peer_does_not_stop_the_round() {
    let network = MemoryNetwork::new();
    let anchor = start(&network, anchor_config());
    let b = start(&network, peer_config("b.onion:80"));
    let c = start(&network, peer_config("c.onion:80"));
    discovery_round(&[&b, &c]).await;
    anchor.components().store.put(obj("x")).unwrap();

    network.set_unreachable("c.onion:80", true);
    let round = anchor.components().sync.run_round().await;

    assert_eq!(round.peers, 2);
    assert_eq!(round.unreachable, 1);
    assert_eq!(round.pushed, 1);
    assert_eq!(b.components().store.len(), 1);
    assert!(c.components().store.is_empty());
}

#[tokio::test]
async fn test_full_peer_rejects_pushes_without_evicting() {
    let network = MemoryNetwork::new();
    let mut small = peer_config("small.onion:80");
    small.storage.capacity = CapacityBudget::objects(1);
    let small = start(&network, small);

    let own = obj("own");
    small.components().store.put(own.clone()).unwrap();

    let response = network
        .push_object("small.onion:80", obj("incoming"))
        .await
        .unwrap();
    assert_eq!(response, PushResponse::Rejected(RejectReason::InsufficientSpace));

    let original = RepositoryObject::new("repo", "tampered", vec![0u8; 16], 1);
    let tampered = {
        let mut bytes = postcard::to_allocvec(&original).unwrap();
        if let Some(last) = bytes.last_mut() {
            *last ^= 0xff;
        }
        postcard::from_bytes::<RepositoryObject>(&bytes).unwrap()
    };
    let response = network.push_object("small.onion:80", tampered).await.unwrap();
    assert_eq!(response, PushResponse::Rejected(RejectReason::InvalidObject));

    assert!(small.components().store.contains(&own.fingerprint()));
    assert_eq!(small.components().store.len(), 1);
}

#[tokio::test]
async fn test_handshake_rejects_inconsistent_peer() {
    let network = MemoryNetwork::new();
    let _anchor = start(&network, anchor_config());

    let mut liar = PeerInfo::new("liar.onion:80", PeerRole::Peer, CapacityBudget::objects(1));
    liar.address = "someone-else.onion:80".into();

    let err = network.handshake(ANCHOR, liar).await.unwrap_err();
    assert!(matches!(err, TransportError::Remote { .. }));
}
