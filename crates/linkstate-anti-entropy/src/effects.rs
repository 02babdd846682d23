//! Replica interface and sync error/statistics types.

use crate::wire::{Advertisement, LinkRemoved, LinkUpdate};
use linkstate_core::effects::MessagingError;
use linkstate_core::{LinkEvent, LinkFragmentId, NodeId};
use std::sync::Arc;

/// Operations a replica exposes to gossip and anti-entropy
///
/// `apply_update` and `apply_removal` run the same conflict resolution as
/// local provider calls, notify the replica's delegate, and never re-broadcast.
pub trait ReplicaEffects: Send + Sync {
    /// Summary of every fragment and tombstone currently held
    fn advertisement(&self) -> Advertisement;

    /// Full descriptions for the requested fragments that are still held
    fn fragments(&self, ids: &[LinkFragmentId]) -> Vec<LinkUpdate>;

    /// Merge a peer's update
    fn apply_update(&self, update: LinkUpdate) -> Option<LinkEvent>;

    /// Merge a peer's removal
    fn apply_removal(&self, removal: LinkRemoved) -> Option<LinkEvent>;
}

impl<T: ReplicaEffects + ?Sized> ReplicaEffects for Arc<T> {
    fn advertisement(&self) -> Advertisement {
        (**self).advertisement()
    }

    fn fragments(&self, ids: &[LinkFragmentId]) -> Vec<LinkUpdate> {
        (**self).fragments(ids)
    }

    fn apply_update(&self, update: LinkUpdate) -> Option<LinkEvent> {
        (**self).apply_update(update)
    }

    fn apply_removal(&self, removal: LinkRemoved) -> Option<LinkEvent> {
        (**self).apply_removal(removal)
    }
}

/// Errors raised by a single anti-entropy exchange
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Peer unreachable: {peer}")]
    PeerUnreachable { peer: NodeId },

    #[error("Exchange with {peer} timed out after {timeout_ms}ms")]
    Timeout { peer: NodeId, timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Wire error: {0}")]
    Wire(String),

    #[error("Incompatible protocol version {received} (local {local})")]
    IncompatibleVersion { received: String, local: String },
}

impl SyncError {
    /// Stable identifier for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Self::PeerUnreachable { .. } => "SYNC_UNREACHABLE",
            Self::Timeout { .. } => "SYNC_TIMEOUT",
            Self::Network(_) => "SYNC_NETWORK",
            Self::Wire(_) => "SYNC_WIRE",
            Self::IncompatibleVersion { .. } => "SYNC_VERSION",
        }
    }
}

impl From<MessagingError> for SyncError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::PeerUnreachable { peer } => SyncError::PeerUnreachable { peer },
            other => SyncError::Network(other.to_string()),
        }
    }
}

/// Outcome of one exchange with one peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeStats {
    pub peer: NodeId,
    /// Fragments requested from the peer
    pub fragments_requested: usize,
    /// Fetched updates that produced an event locally
    pub updates_applied: usize,
    /// Remote tombstones that removed a link locally
    pub tombstones_applied: usize,
}

impl ExchangeStats {
    pub fn new(peer: NodeId) -> Self {
        Self {
            peer,
            fragments_requested: 0,
            updates_applied: 0,
            tombstones_applied: 0,
        }
    }
}

/// Aggregate outcome of one round across all peers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub peers_contacted: usize,
    pub peers_failed: usize,
    pub fragments_requested: usize,
    pub updates_applied: usize,
    pub tombstones_applied: usize,
}

impl RoundStats {
    pub fn absorb(&mut self, exchange: &ExchangeStats) {
        self.peers_contacted += 1;
        self.fragments_requested += exchange.fragments_requested;
        self.updates_applied += exchange.updates_applied;
        self.tombstones_applied += exchange.tombstones_applied;
    }

    pub fn record_failure(&mut self) {
        self.peers_contacted += 1;
        self.peers_failed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messaging_errors_keep_unreachable_peers() {
        let peer = NodeId::new("node-2");
        let err = SyncError::from(MessagingError::PeerUnreachable { peer: peer.clone() });

        assert_eq!(err, SyncError::PeerUnreachable { peer });
        assert_eq!(err.code(), "SYNC_UNREACHABLE");
    }

    #[test]
    fn round_stats_accumulate() {
        let mut round = RoundStats::default();
        let mut exchange = ExchangeStats::new(NodeId::new("node-2"));
        exchange.fragments_requested = 3;
        exchange.updates_applied = 2;
        round.absorb(&exchange);
        round.record_failure();

        assert_eq!(round.peers_contacted, 2);
        assert_eq!(round.peers_failed, 1);
        assert_eq!(round.fragments_requested, 3);
        assert_eq!(round.updates_applied, 2);
    }
}
