#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs, clippy::disallowed_methods)]
//! # Linkstate Anti-Entropy - Layer 2: Dissemination and Reconciliation
//!
//! This crate moves link state between replicas:
//! - Wire messages and subjects for gossip and anti-entropy
//! - Fire-and-forget gossip broadcaster with a bounded outbound queue
//! - Gossip receiver applying peer mutations through the replica merge path
//! - Anti-entropy handler for advertisement-based reconciliation
//!
//! ## Design Principles
//!
//! - **Single merge path**: gossip, anti-entropy and local calls all funnel
//!   into the replica's own conflict resolution, so delivery order is irrelevant
//! - **Best effort push**: gossip is unacknowledged and single-hop
//! - **Pull-based repair**: the initiator of an exchange pulls what it lacks;
//!   the peer heals itself when it initiates its own round
//! - **Bounded exchanges**: every peer exchange runs under a timeout

pub mod broadcast;
pub mod config;
pub mod effects;
pub mod prelude;
pub mod pure;
pub mod receiver;
pub mod sync;
pub mod wire;

pub use broadcast::{BroadcastConfig, GossipBroadcaster};
pub use config::AntiEntropyConfig;
pub use effects::{ExchangeStats, ReplicaEffects, RoundStats, SyncError};
pub use receiver::GossipReceiver;
pub use sync::{AntiEntropyHandler, AntiEntropyResponder};
pub use wire::{Advertisement, FragmentTimestamp, LinkRemoved, LinkUpdate, TombstoneTimestamp};
