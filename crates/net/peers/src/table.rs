//! The membership table.

use std::{collections::BTreeMap, time::Duration};

use hyrule_primitives::{PeerId, PeerInfo};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{EventEmitter, PeerEvent};

/// Result of merging a gossiped entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First time this id was seen.
    Inserted,
    /// The incoming entry was fresher and replaced ours.
    Replaced,
    /// Ours was at least as fresh, or the entry describes the local node.
    Kept,
}

/// Known peers keyed by id (RwLock-protected, one entry per id).
#[derive(Debug)]
pub struct MembershipTable {
    local: PeerId,
    peers: RwLock<BTreeMap<PeerId, PeerInfo>>,
    events: EventEmitter,
}

impl MembershipTable {
    /// Create an empty table for the node identified by `local`.
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            peers: RwLock::new(BTreeMap::new()),
            events: EventEmitter::default(),
        }
    }

    pub fn local_id(&self) -> PeerId {
        self.local
    }

    /// Insert or overwrite the entry for `peer.id`.
    pub fn upsert(&self, peer: PeerInfo) {
        let id = peer.id;
        let previous = self.peers.write().insert(id, peer);
        if previous.is_none() {
            debug!(peer = %id, "Peer discovered");
            self.events.emit(PeerEvent::Discovered { id });
        } else {
            self.events.emit(PeerEvent::Updated { id });
        }
    }

    /// Merge an entry learned second-hand. The higher `last_seen` wins; the
    /// local node's own entry is never taken from gossip.
    pub fn merge(&self, peer: PeerInfo) -> MergeOutcome {
        if peer.id == self.local {
            return MergeOutcome::Kept;
        }

        let id = peer.id;
        let outcome = {
            let mut peers = self.peers.write();
            match peers.get_mut(&id) {
                None => {
                    peers.insert(id, peer);
                    MergeOutcome::Inserted
                }
                Some(existing) if peer.last_seen > existing.last_seen => {
                    let manifest_version = existing.manifest_version.max(peer.manifest_version);
                    *existing = PeerInfo {
                        manifest_version,
                        ..peer
                    };
                    MergeOutcome::Replaced
                }
                Some(_) => MergeOutcome::Kept,
            }
        };

        match outcome {
            MergeOutcome::Inserted => {
                debug!(peer = %id, "Peer discovered via gossip");
                self.events.emit(PeerEvent::Discovered { id });
            }
            MergeOutcome::Replaced => self.events.emit(PeerEvent::Updated { id }),
            MergeOutcome::Kept => {}
        }
        outcome
    }

    pub fn remove(&self, id: &PeerId) -> Option<PeerInfo> {
        let removed = self.peers.write().remove(id);
        if removed.is_some() {
            self.events.emit(PeerEvent::Removed { id: *id });
        }
        removed
    }

    pub fn get(&self, id: &PeerId) -> Option<PeerInfo> {
        self.peers.read().get(id).cloned()
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.read().contains_key(id)
    }

    /// All entries, including the local node, ordered by peer id.
    pub fn snapshot(&self) -> Vec<PeerInfo> {
        self.peers.read().values().cloned().collect()
    }

    /// All entries except the local node, ordered by peer id.
    pub fn remote_peers(&self) -> Vec<PeerInfo> {
        self.peers
            .read()
            .values()
            .filter(|p| p.id != self.local)
            .cloned()
            .collect()
    }

    /// Mark a peer as seen at `now`. Returns `false` if it is unknown.
    pub fn touch(&self, id: &PeerId, now: u64) -> bool {
        match self.peers.write().get_mut(id) {
            Some(peer) => {
                peer.last_seen = peer.last_seen.max(now);
                true
            }
            None => false,
        }
    }

    /// Record the manifest version observed while syncing with `id`.
    pub fn record_manifest_version(&self, id: &PeerId, version: u64) {
        if let Some(peer) = self.peers.write().get_mut(id) {
            peer.manifest_version = version;
        }
    }

    /// Remove every remote entry not seen within `timeout` of `now`.
    ///
    /// The local entry is never expired.
    pub fn expire_stale(&self, now: u64, timeout: Duration) -> Vec<PeerId> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let expired: Vec<PeerId> = {
            let mut peers = self.peers.write();
            let stale: Vec<PeerId> = peers
                .values()
                .filter(|p| p.id != self.local && now.saturating_sub(p.last_seen) > timeout_ms)
                .map(|p| p.id)
                .collect();
            for id in &stale {
                peers.remove(id);
            }
            stale
        };

        for id in &expired {
            trace!(peer = %id, "Peer expired");
            self.events.emit(PeerEvent::Expired { id: *id });
        }
        expired
    }

    /// Number of entries, including the local node.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use hyrule_primitives::{CapacityBudget, PeerRole};

    use super::*;

    fn peer(addr: &str, last_seen: u64) -> PeerInfo {
        PeerInfo::new(addr, PeerRole::Peer, CapacityBudget::objects(10)).with_last_seen(last_seen)
    }

    fn table() -> (MembershipTable, PeerInfo) {
        let local = peer("local:1", 0);
        let table = MembershipTable::new(local.id);
        table.upsert(local.clone());
        (table, local)
    }

    #[test]
    fn test_upsert_keeps_one_entry_per_id() {
        let (table, _) = table();
        table.upsert(peer("a:1", 1));
        table.upsert(peer("a:1", 2));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&PeerId::from_address("a:1")).unwrap().last_seen, 2);
    }

    #[test]
    fn test_snapshot_is_ordered_by_id() {
        let (table, _) = table();
        for addr in ["c:1", "a:1", "b:1", "d:1"] {
            table.upsert(peer(addr, 1));
        }

        let ids: Vec<_> = table.snapshot().into_iter().map(|p| p.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(table.remote_peers().len(), 4);
    }

    #[test]
    fn test_merge_prefers_fresher_entry() {
        let (table, _) = table();
        let mut known = peer("a:1", 10);
        known.manifest_version = 7;
        table.upsert(known);

        assert_eq!(table.merge(peer("a:1", 5)), MergeOutcome::Kept);
        assert_eq!(table.merge(peer("a:1", 10)), MergeOutcome::Kept);
        assert_eq!(table.merge(peer("a:1", 20)), MergeOutcome::Replaced);
        assert_eq!(table.merge(peer("b:1", 1)), MergeOutcome::Inserted);

        let a = table.get(&PeerId::from_address("a:1")).unwrap();
        assert_eq!(a.last_seen, 20);
        assert_eq!(a.manifest_version, 7);
    }

    #[test]
    fn test_merge_ignores_local_entry() {
        let (table, local) = table();
        let gossiped = peer("local:1", 1_000);

        assert_eq!(table.merge(gossiped), MergeOutcome::Kept);
        assert_eq!(table.get(&local.id).unwrap().last_seen, 0);
    }

    #[test]
    fn test_expire_stale() {
        let (table, local) = table();
        table.upsert(peer("old:1", 1_000));
        table.upsert(peer("new:1", 9_000));

        let expired = table.expire_stale(10_000, Duration::from_secs(5));

        assert_eq!(expired, vec![PeerId::from_address("old:1")]);
        assert!(table.contains(&local.id));
        assert!(table.contains(&PeerId::from_address("new:1")));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_touch_and_manifest_version() {
        let (table, _) = table();
        let id = PeerId::from_address("a:1");
        table.upsert(peer("a:1", 5));

        assert!(table.touch(&id, 50));
        assert!(!table.touch(&PeerId::from_address("z:1"), 50));
        table.record_manifest_version(&id, 3);

        let a = table.get(&id).unwrap();
        assert_eq!((a.last_seen, a.manifest_version), (50, 3));
    }

    #[tokio::test]
    async fn test_events() {
        let (table, _) = table();
        let mut rx = table.events().subscribe();
        let id = PeerId::from_address("a:1");

        table.upsert(peer("a:1", 1));
        table.upsert(peer("a:1", 2));
        table.remove(&id);

        assert_eq!(rx.recv().await.unwrap(), PeerEvent::Discovered { id });
        assert_eq!(rx.recv().await.unwrap(), PeerEvent::Updated { id });
        assert_eq!(rx.recv().await.unwrap(), PeerEvent::Removed { id });
    }
}
