//! Content store metrics.

use metrics::{Counter, Gauge};

#[derive(Clone, Debug)]
pub(crate) struct StoreMetrics {
    /// Objects newly inserted.
    objects_stored: Counter,
    /// Objects removed to make room.
    objects_evicted: Counter,
    /// Inserts refused for lack of space.
    objects_rejected: Counter,
    /// Objects currently held.
    objects: Gauge,
    /// Payload bytes currently held.
    bytes_used: Gauge,
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self {
            objects_stored: metrics::counter!("storage.objects_stored"),
            objects_evicted: metrics::counter!("storage.objects_evicted"),
            objects_rejected: metrics::counter!("storage.objects_rejected"),
            objects: metrics::gauge!("storage.objects"),
            bytes_used: metrics::gauge!("storage.bytes_used"),
        }
    }
}

impl StoreMetrics {
    pub(crate) fn on_stored(&self, evicted: usize) {
        self.objects_stored.increment(1);
        self.objects_evicted.increment(evicted as u64);
    }

    pub(crate) fn on_evicted(&self, evicted: usize) {
        self.objects_evicted.increment(evicted as u64);
    }

    pub(crate) fn on_rejected(&self) {
        self.objects_rejected.increment(1);
    }

    pub(crate) fn set_usage(&self, objects: usize, bytes: u64) {
        self.objects.set(objects as f64);
        self.bytes_used.set(bytes as f64);
    }
}
