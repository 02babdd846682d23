//! # Linkstate Store - Layer 3: Replicated Link Inventory
//!
//! Cluster-wide inventory of directed network links with eventual
//! consistency. Each replica:
//!
//! - keeps one timestamped description per (link, provider) and composes the
//!   visible [`Link`](linkstate_core::Link) from them
//! - rejects stale mutations and resurrection of removed links via tombstones
//! - gossips accepted local mutations to every peer, best effort
//! - repairs missed gossip with periodic anti-entropy rounds
//!
//! ```rust,no_run
//! # async fn demo(
//! #     clock: std::sync::Arc<dyn linkstate_core::effects::ClockEffects>,
//! #     messaging: std::sync::Arc<dyn linkstate_core::effects::MessagingEffects>,
//! # ) -> linkstate_core::LinkStoreResult<()> {
//! use linkstate_core::effects::NoopDelegate;
//! use linkstate_core::{ConnectPoint, LinkDescription, LinkType, ProviderId};
//! use linkstate_store::{LinkStore, LinkStoreConfig};
//! use std::sync::Arc;
//!
//! let store = LinkStore::start(LinkStoreConfig::default(), clock, messaging, Arc::new(NoopDelegate))?;
//! let description = LinkDescription::new(
//!     ConnectPoint::new("of:1", 1),
//!     ConnectPoint::new("of:2", 1),
//!     LinkType::Direct,
//! );
//! store.create_or_update_link(&ProviderId::new("lldp", "core"), description)?;
//! store.stop().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod descriptors;
pub mod indices;
pub mod runtime;
pub mod store;
pub mod tombstones;

pub use config::{LinkStoreConfig, TombstoneConfig};
pub use runtime::LinkStore;
pub use store::GossipLinkStore;
