//! Discovery metrics.

use metrics::{Counter, Gauge};

#[derive(Clone, Debug)]
pub(crate) struct DiscoveryMetrics {
    handshakes_ok: Counter,
    handshakes_failed: Counter,
    handshakes_served: Counter,
    peers_expired: Counter,
    known_peers: Gauge,
}

impl Default for DiscoveryMetrics {
    fn default() -> Self {
        Self {
            handshakes_ok: metrics::counter!("discovery.handshakes", "outcome" => "ok"),
            handshakes_failed: metrics::counter!("discovery.handshakes", "outcome" => "failed"),
            handshakes_served: metrics::counter!("discovery.handshakes_served"),
            peers_expired: metrics::counter!("discovery.peers_expired"),
            known_peers: metrics::gauge!("discovery.known_peers"),
        }
    }
}

impl DiscoveryMetrics {
    pub(crate) fn on_handshake(&self, ok: bool) {
        if ok {
            self.handshakes_ok.increment(1);
        } else {
            self.handshakes_failed.increment(1);
        }
    }

    pub(crate) fn on_served(&self) {
        self.handshakes_served.increment(1);
    }

    pub(crate) fn on_round_end(&self, expired: usize, known: usize) {
        self.peers_expired.increment(expired as u64);
        self.known_peers.set(known as f64);
    }
}
