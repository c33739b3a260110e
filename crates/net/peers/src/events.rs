//! Membership events and non-blocking broadcast emitter.

use hyrule_primitives::PeerId;
use tokio::sync::broadcast;

/// Membership table events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A peer id was seen for the first time.
    Discovered { id: PeerId },
    /// An existing entry was replaced with fresher information.
    Updated { id: PeerId },
    /// An entry was removed explicitly.
    Removed { id: PeerId },
    /// An entry was garbage-collected after the liveness timeout.
    Expired { id: PeerId },
}

impl PeerEvent {
    pub fn peer_id(&self) -> &PeerId {
        match self {
            Self::Discovered { id }
            | Self::Updated { id }
            | Self::Removed { id }
            | Self::Expired { id } => id,
        }
    }

    pub fn is_departure(&self) -> bool {
        matches!(self, Self::Removed { .. } | Self::Expired { .. })
    }
}

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Non-blocking broadcast emitter. Slow subscribers drop events independently.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<PeerEvent>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: PeerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discovery_reaches_subscriber() {
        let emitter = EventEmitter::default();
        let mut rx = emitter.subscribe();
        let id = PeerId::from_address("a:1");

        emitter.emit(PeerEvent::Discovered { id });

        assert_eq!(rx.recv().await.unwrap(), PeerEvent::Discovered { id });
    }

    #[tokio::test]
    async fn test_departures_reach_every_subscriber() {
        let emitter = EventEmitter::default();
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();
        let id = PeerId::from_address("a:1");

        emitter.emit(PeerEvent::Expired { id });

        assert!(rx1.recv().await.unwrap().is_departure());
        assert_eq!(*rx2.recv().await.unwrap().peer_id(), id);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let emitter = EventEmitter::default();
        assert_eq!(emitter.subscriber_count(), 0);
        emitter.emit(PeerEvent::Removed {
            id: PeerId::from_address("a:1"),
        });
    }
}
