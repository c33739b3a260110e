//! The sync engine.

use std::{collections::BTreeMap, sync::Arc};

use futures::{StreamExt, stream};
use hyrule_net_peers::MembershipTable;
use hyrule_net_transport::{FetchResponse, PeerTransport, PushResponse};
use hyrule_primitives::{PeerId, PeerInfo, unix_millis};
use hyrule_storage::{ContentStore, PutOutcome, StoreError};
use parking_lot::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    Direction, PeerSyncState, SyncConfig, SyncError, SyncPlan, Transfer, metrics::SyncMetrics,
};

/// Result of syncing with one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub peer: PeerId,
    /// Manifest version the peer reported.
    pub remote_version: u64,
    pub fetched: usize,
    pub pushed: usize,
    /// Objects that vanished or arrived by other means mid-round.
    pub skipped: usize,
    /// Objects refused for lack of space, on either side.
    pub rejected: usize,
    /// Transfers that failed and will be retried next round.
    pub failed: usize,
}

impl SyncReport {
    fn new(peer: PeerId, remote_version: u64) -> Self {
        Self {
            peer,
            remote_version,
            fetched: 0,
            pushed: 0,
            skipped: 0,
            rejected: 0,
            failed: 0,
        }
    }

    /// Whether nothing moved in either direction.
    pub fn is_noop(&self) -> bool {
        self.fetched == 0 && self.pushed == 0
    }

    fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Fetched => self.fetched += 1,
            TransferOutcome::Pushed => self.pushed += 1,
            TransferOutcome::Skipped => self.skipped += 1,
            TransferOutcome::Rejected => self.rejected += 1,
            TransferOutcome::Failed => self.failed += 1,
        }
    }
}

/// Totals over one round across all peers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub peers: usize,
    /// Peers whose manifest could not be fetched, or that were busy.
    pub unreachable: usize,
    pub fetched: usize,
    pub pushed: usize,
    pub rejected: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferOutcome {
    Fetched,
    Pushed,
    Skipped,
    Rejected,
    Failed,
}

/// Drives replication with every known peer.
pub struct SyncEngine {
    config: SyncConfig,
    store: Arc<ContentStore>,
    table: Arc<MembershipTable>,
    transport: Arc<dyn PeerTransport>,
    states: Mutex<BTreeMap<PeerId, PeerSyncState>>,
    metrics: SyncMetrics,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Resets a peer to `Idle` if its sync is dropped part way, so an
/// abandoned round never leaves the peer looking busy.
struct InFlight<'a> {
    engine: &'a SyncEngine,
    peer: PeerId,
    done: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.engine.set_state(self.peer, PeerSyncState::Idle);
        }
    }
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        store: Arc<ContentStore>,
        table: Arc<MembershipTable>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            config,
            store,
            table,
            transport,
            states: Mutex::new(BTreeMap::new()),
            metrics: SyncMetrics::default(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current state of every peer synced so far.
    pub fn states(&self) -> BTreeMap<PeerId, PeerSyncState> {
        self.states.lock().clone()
    }

    pub fn state(&self, peer: &PeerId) -> PeerSyncState {
        self.states.lock().get(peer).copied().unwrap_or_default()
    }

    fn set_state(&self, peer: PeerId, state: PeerSyncState) {
        trace!(%peer, %state, "Sync state");
        self.states.lock().insert(peer, state);
    }

    /// Claim `peer` for a sync, failing if one is already running.
    fn begin(&self, peer: PeerId) -> Result<InFlight<'_>, SyncError> {
        let mut states = self.states.lock();
        let state = states.entry(peer).or_default();
        if !state.can_start() {
            return Err(SyncError::InProgress(peer));
        }
        *state = PeerSyncState::ManifestRequested;
        Ok(InFlight {
            engine: self,
            peer,
            done: false,
        })
    }

    /// Reconcile with one peer and transfer the difference both ways.
    pub async fn sync_peer(&self, peer: &PeerInfo) -> Result<SyncReport, SyncError> {
        let mut flight = self.begin(peer.id)?;

        let remote = match self.transport.get_manifest(&peer.address).await {
            Ok(manifest) => manifest,
            Err(source) => {
                flight.done = true;
                self.set_state(peer.id, PeerSyncState::Failed);
                self.metrics.manifest_failures.increment(1);
                return Err(SyncError::Manifest {
                    peer: peer.id,
                    source,
                });
            }
        };
        self.table.record_manifest_version(&peer.id, remote.version);
        self.table.touch(&peer.id, unix_millis());

        self.set_state(peer.id, PeerSyncState::Reconciling);
        let plan = SyncPlan::build(&self.store.manifest(), &remote);
        let mut report = SyncReport::new(peer.id, remote.version);

        if !plan.is_empty() {
            self.set_state(peer.id, PeerSyncState::Transferring);
            debug!(
                peer = %peer.id,
                fetch = plan.count(Direction::Fetch),
                push = plan.count(Direction::Push),
                "Transferring"
            );

            for phase in [plan.first, plan.second] {
                let outcomes: Vec<TransferOutcome> = stream::iter(phase)
                    .map(|transfer| self.transfer(peer, transfer))
                    .buffer_unordered(self.config.max_concurrent_transfers.max(1))
                    .collect()
                    .await;
                for outcome in outcomes {
                    report.record(outcome);
                }
            }
        }

        flight.done = true;
        let end_state = if report.failed > 0 {
            PeerSyncState::Failed
        } else {
            PeerSyncState::Idle
        };
        self.set_state(peer.id, end_state);

        if !report.is_noop() || report.failed > 0 {
            info!(
                peer = %peer.id,
                fetched = report.fetched,
                pushed = report.pushed,
                rejected = report.rejected,
                failed = report.failed,
                "Synced with peer"
            );
        }
        Ok(report)
    }

    async fn transfer(&self, peer: &PeerInfo, transfer: Transfer) -> TransferOutcome {
        let fingerprint = transfer.fingerprint;
        let outcome = match transfer.direction {
            Direction::Fetch => self.fetch(peer, transfer).await,
            Direction::Push => self.push(peer, transfer).await,
        };

        match outcome {
            TransferOutcome::Fetched => self.metrics.objects_fetched.increment(1),
            TransferOutcome::Pushed => self.metrics.objects_pushed.increment(1),
            TransferOutcome::Rejected => self.metrics.objects_rejected.increment(1),
            TransferOutcome::Failed => self.metrics.transfer_failures.increment(1),
            TransferOutcome::Skipped => {}
        }
        trace!(peer = %peer.id, %fingerprint, ?outcome, "Transfer finished");
        outcome
    }

    async fn fetch(&self, peer: &PeerInfo, transfer: Transfer) -> TransferOutcome {
        let fingerprint = transfer.fingerprint;
        let object = match self
            .transport
            .fetch_object(&peer.address, fingerprint)
            .await
        {
            Ok(FetchResponse::Found(object)) => object,
            Ok(FetchResponse::NotFound) => return TransferOutcome::Skipped,
            Err(error) => {
                warn!(peer = %peer.id, %fingerprint, %error, "Fetch failed");
                return TransferOutcome::Failed;
            }
        };

        if object.fingerprint() != fingerprint || object.repo() != &transfer.repo {
            warn!(peer = %peer.id, %fingerprint, "Peer returned a different object");
            return TransferOutcome::Failed;
        }

        let eviction = self.config.eviction;
        let stored = self
            .store
            .blocking(move |store| store.put_with(object, eviction))
            .await;
        match stored {
            Ok(PutOutcome::Stored { .. }) => TransferOutcome::Fetched,
            Ok(PutOutcome::AlreadyPresent) => TransferOutcome::Skipped,
            Err(StoreError::CapacityExceeded { .. } | StoreError::InsufficientSpace { .. }) => {
                debug!(peer = %peer.id, %fingerprint, "Not enough space for fetched object");
                TransferOutcome::Rejected
            }
            Err(error) => {
                warn!(peer = %peer.id, %fingerprint, %error, "Storing fetched object failed");
                TransferOutcome::Failed
            }
        }
    }

    async fn push(&self, peer: &PeerInfo, transfer: Transfer) -> TransferOutcome {
        let fingerprint = transfer.fingerprint;
        let object = match self.store.blocking(move |store| store.get(&fingerprint)).await {
            Ok(Some(object)) => object,
            Ok(None) => return TransferOutcome::Skipped,
            Err(error) => {
                warn!(%fingerprint, %error, "Reading object to push failed");
                return TransferOutcome::Failed;
            }
        };

        match self.transport.push_object(&peer.address, object).await {
            Ok(PushResponse::Accepted) => TransferOutcome::Pushed,
            Ok(PushResponse::Rejected(reason)) => {
                debug!(peer = %peer.id, %fingerprint, %reason, "Push rejected");
                TransferOutcome::Rejected
            }
            Err(error) => {
                warn!(peer = %peer.id, %fingerprint, %error, "Push failed");
                TransferOutcome::Failed
            }
        }
    }

    /// Sync with every remote peer in the membership table.
    pub async fn run_round(&self) -> RoundSummary {
        let peers = self.table.remote_peers();
        let mut summary = RoundSummary {
            peers: peers.len(),
            ..Default::default()
        };

        let results: Vec<_> = stream::iter(peers.into_iter())
            .map(|peer| async move { self.sync_peer(&peer).await })
            .buffer_unordered(self.config.max_concurrent_peers.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(report) => {
                    summary.fetched += report.fetched;
                    summary.pushed += report.pushed;
                    summary.rejected += report.rejected;
                    summary.failed += report.failed;
                }
                Err(error) => {
                    summary.unreachable += 1;
                    warn!(%error, "Sync with peer failed");
                }
            }
        }

        self.metrics.rounds.increment(1);
        debug!(?summary, "Sync round finished");
        summary
    }

    /// Run rounds every interval until `shutdown` fires. A round in
    /// progress at shutdown is abandoned; completed transfers stay.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Give discovery a head start.
        ticker.tick().await;

        info!(interval = ?self.config.interval, "Sync started");
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
        info!("Sync stopped");
    }
}
