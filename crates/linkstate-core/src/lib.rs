//! Linkstate Core - Foundation types for the replicated link store
//!
//! This crate provides the value types and effect interfaces shared by every
//! layer of the link store. It holds no replication logic of its own.
//!
//! # Contents
//!
//! ## Identity and Time
//! - `ConnectPoint`, `LinkKey`, `ProviderId`, `NodeId`: immutable identities
//! - `Timestamp`, `Timestamped<T>`: totally ordered recency markers
//!
//! ## Link Model
//! - `LinkDescription`: one provider's view of a link
//! - `Link`: the composed, externally visible link
//! - `LinkEvent`: `Added` / `Updated` / `Removed` notifications
//!
//! ## Effect Interfaces
//! - `ClockEffects`: per-device timestamp source
//! - `MessagingEffects`: cluster broadcast, request/response and subscriptions
//! - `LinkStoreDelegate`: receiver of resulting link events
//!
//! ## Infrastructure
//! - DAG-CBOR versioned serialization for the wire
//! - Configuration loading and validation helpers

#![forbid(unsafe_code)]

/// Configuration loading, merging and validation
pub mod config;

/// Effect interfaces consumed by the link store
pub mod effects;

/// Unified error handling
pub mod errors;

/// DAG-CBOR serialization (wire format)
pub mod serialization;

/// Timestamps and timestamped values
pub mod time;

/// Identity and link model types
pub mod types;

pub use errors::{LinkStoreError, LinkStoreResult};
pub use time::{Timestamp, Timestamped};
pub use types::{
    Annotations, ConnectPoint, DeviceId, Link, LinkDescription, LinkEvent, LinkEventKind,
    LinkFragmentId, LinkKey, LinkType, NodeId, PortNumber, ProviderId,
};
