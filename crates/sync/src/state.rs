//! Per-peer sync state machine.

use serde::Serialize;

/// Where a peer is in its sync cycle.
///
/// `Idle -> ManifestRequested -> Reconciling -> Transferring -> Idle`, or
/// `-> Failed` from any step. `Failed` behaves like `Idle` on the next round.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeerSyncState {
    #[default]
    Idle,
    ManifestRequested,
    Reconciling,
    Transferring,
    Failed,
}

impl PeerSyncState {
    /// Whether a new sync may start from this state.
    pub const fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_start() {
        assert!(PeerSyncState::Idle.can_start());
        assert!(PeerSyncState::Failed.can_start());
        assert!(!PeerSyncState::ManifestRequested.can_start());
        assert!(!PeerSyncState::Transferring.can_start());
    }

    #[test]
    fn test_display() {
        assert_eq!(PeerSyncState::ManifestRequested.to_string(), "manifest_requested");
    }
}
