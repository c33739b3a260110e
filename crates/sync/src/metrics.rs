//! Sync metrics.

use metrics::Counter;

#[derive(Clone, Debug)]
pub(crate) struct SyncMetrics {
    pub(crate) objects_fetched: Counter,
    pub(crate) objects_pushed: Counter,
    pub(crate) objects_rejected: Counter,
    pub(crate) transfer_failures: Counter,
    pub(crate) manifest_failures: Counter,
    pub(crate) rounds: Counter,
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self {
            objects_fetched: metrics::counter!("sync.objects_fetched"),
            objects_pushed: metrics::counter!("sync.objects_pushed"),
            objects_rejected: metrics::counter!("sync.objects_rejected"),
            transfer_failures: metrics::counter!("sync.transfer_failures"),
            manifest_failures: metrics::counter!("sync.manifest_failures"),
            rounds: metrics::counter!("sync.rounds"),
        }
    }
}
