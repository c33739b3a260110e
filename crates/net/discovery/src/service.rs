//! The discovery service.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::future::join_all;
use hyrule_net_peers::MembershipTable;
use hyrule_net_transport::{HandshakeResponse, PeerTransport};
use hyrule_primitives::{PeerId, PeerInfo, unix_millis};
use rand::seq::SliceRandom;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{DiscoveryConfig, DiscoveryError, metrics::DiscoveryMetrics};

/// Supplies the manifest version advertised in our own entry.
pub type ManifestVersionSource = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Summary of one discovery round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Whether the anchor was contacted this round, and answered.
    pub bootstrapped: bool,
    /// Handshakes attempted, anchor bootstrap included.
    pub contacted: usize,
    pub failed: usize,
    /// Entries dropped by the liveness timeout.
    pub expired: usize,
    /// Table size at the end of the round, own entry included.
    pub known: usize,
}

/// Maintains the [`MembershipTable`] through anchor bootstrap and gossip.
pub struct DiscoveryService {
    config: DiscoveryConfig,
    /// Our own entry, without `last_seen` or `manifest_version`.
    local: PeerInfo,
    table: Arc<MembershipTable>,
    transport: Arc<dyn PeerTransport>,
    manifest_version: ManifestVersionSource,
    bootstrapped: AtomicBool,
    metrics: DiscoveryMetrics,
}

impl std::fmt::Debug for DiscoveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryService")
            .field("local", &self.local.address)
            .field("role", &self.local.role)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DiscoveryService {
    pub fn new(
        config: DiscoveryConfig,
        local: PeerInfo,
        table: Arc<MembershipTable>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        let service = Self {
            config,
            local,
            table,
            transport,
            manifest_version: Arc::new(|| 0),
            bootstrapped: AtomicBool::new(false),
            metrics: DiscoveryMetrics::default(),
        };
        service.refresh_self();
        service
    }

    /// Advertise manifest versions from `source` (typically the store).
    pub fn with_manifest_version(mut self, source: ManifestVersionSource) -> Self {
        self.manifest_version = source;
        self.refresh_self();
        self
    }

    pub fn table(&self) -> &Arc<MembershipTable> {
        &self.table
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::Relaxed)
    }

    /// Our own entry, stamped now.
    pub fn self_info(&self) -> PeerInfo {
        PeerInfo {
            last_seen: unix_millis(),
            manifest_version: (self.manifest_version)(),
            ..self.local.clone()
        }
    }

    fn refresh_self(&self) {
        self.table.upsert(self.self_info());
    }

    /// Answer an inbound handshake: record the requester as seen now and
    /// return our entry plus our table.
    pub fn handle_handshake(&self, remote: PeerInfo) -> Result<HandshakeResponse, DiscoveryError> {
        if !remote.is_consistent() {
            return Err(DiscoveryError::InvalidPeer {
                id: remote.id,
                address: remote.address,
            });
        }
        if remote.id == self.local.id {
            return Err(DiscoveryError::SelfHandshake);
        }

        debug!(peer = %remote.id, address = %remote.address, role = %remote.role, "Handshake received");
        self.table.upsert(PeerInfo {
            last_seen: unix_millis(),
            ..remote
        });
        self.refresh_self();
        self.metrics.on_served();

        Ok(HandshakeResponse {
            info: self.self_info(),
            peers: self.table.snapshot(),
        })
    }

    /// Handshake `addr` and merge the result. Returns the responder's id.
    ///
    /// The responder is identified by the entry it returns, not by the
    /// address we dialled: an anchor configured as `http://host:port` or
    /// behind another name still advertises its own address.
    async fn contact(&self, addr: &str) -> Result<PeerId, DiscoveryError> {
        let result = self.transport.handshake(addr, self.self_info()).await;
        self.metrics.on_handshake(result.is_ok());
        let response = result?;

        let responder = response.info;
        if !responder.is_consistent() {
            return Err(DiscoveryError::InvalidPeer {
                id: responder.id,
                address: responder.address,
            });
        }
        if responder.id == self.local.id {
            return Err(DiscoveryError::SelfHandshake);
        }
        if responder.address != addr {
            warn!(
                dialled = %addr,
                advertised = %responder.address,
                peer = %responder.id,
                "Peer advertises a different address than the one dialled"
            );
        }

        // Direct contact: the responder is alive as of now, whatever it says.
        let id = responder.id;
        let manifest_version = self.table.get(&id).map_or(0, |p| p.manifest_version);
        self.table.upsert(PeerInfo {
            last_seen: unix_millis(),
            manifest_version,
            ..responder
        });

        let mut learned = 0;
        for peer in response.peers {
            if peer.is_consistent()
                && self.table.merge(peer) == hyrule_net_peers::MergeOutcome::Inserted
            {
                learned += 1;
            }
        }
        debug!(%addr, peer = %id, learned, "Handshake completed");
        Ok(id)
    }

    /// Handshake the configured anchor. A no-op without one.
    pub async fn bootstrap(&self) -> Result<bool, DiscoveryError> {
        Ok(self.contact_anchor().await?.is_some())
    }

    async fn contact_anchor(&self) -> Result<Option<PeerId>, DiscoveryError> {
        let Some(anchor) = self.config.anchor_addr.as_deref() else {
            return Ok(None);
        };

        let id = self.contact(anchor).await?;
        if !self.bootstrapped.swap(true, Ordering::Relaxed) {
            info!(%anchor, peer = %id, peers = self.table.len(), "Bootstrapped from anchor");
        }
        Ok(Some(id))
    }

    /// Up to `fanout` random remote peers.
    fn select_targets(&self, exclude: Option<PeerId>) -> Vec<PeerInfo> {
        let mut candidates: Vec<PeerInfo> = self
            .table
            .remote_peers()
            .into_iter()
            .filter(|p| Some(p.id) != exclude)
            .collect();
        candidates.shuffle(&mut rand::rng());
        candidates.truncate(self.config.fanout);
        candidates
    }

    /// Run one discovery round.
    pub async fn run_round(&self) -> RoundReport {
        let mut report = RoundReport::default();
        self.refresh_self();

        let needs_anchor = self.config.anchor_addr.is_some()
            && (!self.is_bootstrapped() || self.table.remote_peers().is_empty());
        let mut anchor = None;
        if needs_anchor {
            report.contacted += 1;
            match self.contact_anchor().await {
                Ok(id) => {
                    report.bootstrapped = id.is_some();
                    anchor = id;
                }
                Err(error) => {
                    report.failed += 1;
                    warn!(anchor = ?self.config.anchor_addr, %error, "Anchor bootstrap failed");
                }
            }
        }

        let targets = self.select_targets(anchor);
        report.contacted += targets.len();

        let results = join_all(targets.iter().map(|peer| self.contact(&peer.address))).await;
        for (peer, result) in targets.iter().zip(results) {
            if let Err(error) = result {
                report.failed += 1;
                warn!(peer = %peer.id, address = %peer.address, %error, "Handshake failed");
            }
        }

        let expired = self
            .table
            .expire_stale(unix_millis(), self.config.liveness_timeout);
        for id in &expired {
            info!(peer = %id, "Peer expired");
        }
        report.expired = expired.len();
        report.known = self.table.len();

        self.metrics.on_round_end(report.expired, report.known);
        debug!(?report, "Discovery round finished");
        report
    }

    /// Run rounds every interval until `shutdown` fires. The first round
    /// runs immediately.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            role = %self.local.role,
            anchor = ?self.config.anchor_addr,
            interval = ?self.config.interval,
            "Discovery started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.run_round() => {}
                    }
                }
            }
        }

        info!("Discovery stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use hyrule_net_transport::{
        FetchResponse, MemoryNetwork, PeerService, PushResponse, TransportError, TransportResult,
    };
    use hyrule_primitives::{
        CapacityBudget, Fingerprint, PeerRole, RepositoryManifest, RepositoryObject,
    };

    use super::*;

    /// Serves only the handshake, delegating to a discovery service.
    struct HandshakeOnly(Arc<DiscoveryService>);

    #[async_trait]
    impl PeerService for HandshakeOnly {
        async fn handshake(&self, remote: PeerInfo) -> TransportResult<HandshakeResponse> {
            self.0
                .handle_handshake(remote)
                .map_err(|e| TransportError::Remote {
                    addr: self.0.local.address.clone(),
                    message: e.to_string(),
                })
        }

        async fn manifest(&self) -> TransportResult<RepositoryManifest> {
            Ok(RepositoryManifest::new())
        }

        async fn fetch(&self, _fingerprint: Fingerprint) -> TransportResult<FetchResponse> {
            Ok(FetchResponse::NotFound)
        }

        async fn push(&self, _object: RepositoryObject) -> TransportResult<PushResponse> {
            Ok(PushResponse::Accepted)
        }
    }

    fn node(
        network: &MemoryNetwork,
        address: &str,
        role: PeerRole,
        anchor: Option<&str>,
    ) -> Arc<DiscoveryService> {
        let local = PeerInfo::new(address, role, CapacityBudget::objects(100));
        let table = Arc::new(MembershipTable::new(local.id));
        let config = DiscoveryConfig {
            anchor_addr: anchor.map(str::to_owned),
            ..Default::default()
        };
        let service = Arc::new(DiscoveryService::new(
            config,
            local,
            table,
            Arc::new(network.clone()),
        ));
        network.register(address, Arc::new(HandshakeOnly(service.clone())));
        service
    }

    #[tokio::test]
    async fn test_anchor_and_two_peers_converge_in_two_rounds() {
        let network = MemoryNetwork::new();
        let anchor = node(&network, "anchor:7000", PeerRole::Anchor, None);
        let a = node(&network, "a:7000", PeerRole::Peer, Some("anchor:7000"));
        let b = node(&network, "b:7000", PeerRole::Peer, Some("anchor:7000"));

        for _ in 0..2 {
            for n in [&anchor, &a, &b] {
                n.run_round().await;
            }
        }

        for n in [&anchor, &a, &b] {
            assert_eq!(n.table().len(), 3, "{n:?}");
        }
        assert!(a.is_bootstrapped());
        assert!(!anchor.is_bootstrapped());
    }

    #[tokio::test]
    async fn test_single_node_without_anchor() {
        let network = MemoryNetwork::new();
        let solo = node(&network, "solo:7000", PeerRole::Peer, None);

        let report = solo.run_round().await;

        assert_eq!(report.contacted, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(solo.table().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_anchor_is_retried() {
        let network = MemoryNetwork::new();
        let peer = node(&network, "a:7000", PeerRole::Peer, Some("anchor:7000"));

        let report = peer.run_round().await;
        assert_eq!((report.contacted, report.failed), (1, 1));
        assert!(!peer.is_bootstrapped());

        let _anchor = node(&network, "anchor:7000", PeerRole::Anchor, None);
        let report = peer.run_round().await;
        assert!(report.bootstrapped);
        assert_eq!(peer.table().len(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_through_anchor_alias() {
        let network = MemoryNetwork::new();
        let anchor = node(&network, "127.0.0.1:7000", PeerRole::Anchor, None);
        network.register(
            "http://127.0.0.1:7000",
            Arc::new(HandshakeOnly(anchor.clone())),
        );
        let peer = node(&network, "b:7000", PeerRole::Peer, Some("http://127.0.0.1:7000"));

        let report = peer.run_round().await;

        assert!(report.bootstrapped, "{report:?}");
        assert_eq!(report.failed, 0);
        assert!(peer.is_bootstrapped());
        assert_eq!(peer.table().len(), 2);
        assert_eq!(anchor.table().len(), 2);

        let anchor_id = PeerId::from_address("127.0.0.1:7000");
        let entry = peer.table().get(&anchor_id).unwrap();
        assert_eq!(entry.address, "127.0.0.1:7000");
        assert_eq!(entry.role, PeerRole::Anchor);
    }

    #[tokio::test]
    async fn test_dialling_own_address_is_rejected() {
        let network = MemoryNetwork::new();
        let me = node(&network, "me:7000", PeerRole::Peer, Some("me:7000"));

        assert!(me.bootstrap().await.is_err());
        assert!(!me.is_bootstrapped());
        assert_eq!(me.table().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_handshake_keeps_peer_until_stale() {
        let network = MemoryNetwork::new();
        let me = node(&network, "me:7000", PeerRole::Peer, None);
        let now = unix_millis();

        let fresh = PeerInfo::new("fresh:7000", PeerRole::Peer, CapacityBudget::objects(1))
            .with_last_seen(now);
        let stale = PeerInfo::new("stale:7000", PeerRole::Peer, CapacityBudget::objects(1))
            .with_last_seen(now.saturating_sub(Duration::from_secs(3600).as_millis() as u64));
        me.table().upsert(fresh.clone());
        me.table().upsert(stale.clone());

        let report = me.run_round().await;

        assert_eq!(report.failed, 2);
        assert_eq!(report.expired, 1);
        assert!(me.table().contains(&fresh.id));
        assert!(!me.table().contains(&stale.id));
    }

    #[tokio::test]
    async fn test_handshake_validation() {
        let network = MemoryNetwork::new();
        let me = node(&network, "me:7000", PeerRole::Anchor, None);

        let mut forged = PeerInfo::new("x:1", PeerRole::Peer, CapacityBudget::objects(1));
        forged.id = PeerId::from_address("y:1");
        assert!(matches!(
            me.handle_handshake(forged),
            Err(DiscoveryError::InvalidPeer { .. })
        ));

        let own = PeerInfo::new("me:7000", PeerRole::Peer, CapacityBudget::objects(1));
        assert!(matches!(
            me.handle_handshake(own),
            Err(DiscoveryError::SelfHandshake)
        ));
    }

    #[tokio::test]
    async fn test_self_entry_carries_manifest_version() {
        let network = MemoryNetwork::new();
        let local = PeerInfo::new("me:7000", PeerRole::Peer, CapacityBudget::objects(1));
        let table = Arc::new(MembershipTable::new(local.id));
        let service = DiscoveryService::new(
            DiscoveryConfig::default(),
            local.clone(),
            table.clone(),
            Arc::new(network),
        )
        .with_manifest_version(Arc::new(|| 42));

        assert_eq!(table.get(&local.id).unwrap().manifest_version, 42);
        assert_eq!(service.self_info().manifest_version, 42);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let network = MemoryNetwork::new();
        let me = node(&network, "me:7000", PeerRole::Peer, None);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(me.clone().run(shutdown.clone()));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
