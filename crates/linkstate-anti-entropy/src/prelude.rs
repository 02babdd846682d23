//! Linkstate anti-entropy prelude.
//!
//! Curated re-exports for wiring a replica into a cluster.

pub use crate::wire::{
    anti_entropy_subjects, gossip_subjects, FragmentRequest, FragmentResponse, WIRE_VERSION,
};
pub use crate::{
    Advertisement, AntiEntropyConfig, AntiEntropyHandler, AntiEntropyResponder, BroadcastConfig,
    ExchangeStats, GossipBroadcaster, GossipReceiver, LinkRemoved, LinkUpdate, ReplicaEffects,
    RoundStats, SyncError,
};
