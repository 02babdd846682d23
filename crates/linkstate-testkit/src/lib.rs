//! Linkstate Testing Infrastructure
//!
//! Shared test support for the link store crates: an in-memory cluster that
//! implements the messaging effects with fault injection, a manually driven
//! clock, a delegate that records events, fixtures and proptest strategies.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! linkstate-testkit = { path = "../linkstate-testkit" }
//! ```
//!
//! ```rust,no_run
//! use linkstate_testkit::{MemoryCluster, ManualClock};
//!
//! let cluster = MemoryCluster::new();
//! let node_a = cluster.join("a");
//! let clock = ManualClock::new();
//! ```

pub mod clock;
pub mod cluster;
pub mod delegate;
pub mod fixtures;
pub mod strategies;

pub use clock::ManualClock;
pub use cluster::{GossipMode, MemoryCluster, MemoryMessaging};
pub use delegate::RecordingDelegate;

/// Install a test subscriber honouring `RUST_LOG`; repeated calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
