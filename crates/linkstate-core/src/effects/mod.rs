//! Effect interfaces consumed by the link store
//!
//! The store never reaches collaborators through ambient lookup. Each one is
//! injected at construction through these traits:
//!
//! - [`ClockEffects`]: per-device timestamps for every mutation
//! - [`MessagingEffects`]: cluster broadcast, request/response, subscriptions
//! - [`LinkStoreDelegate`]: receives every resulting [`crate::LinkEvent`]

pub mod clock;
pub mod delegate;
pub mod messaging;

pub use clock::{ClockEffects, ClockError, DeviceClock};
pub use delegate::{LinkStoreDelegate, NoopDelegate};
pub use messaging::{
    ClusterMessage, MessageHandler, MessageSubject, MessagingEffects, MessagingError,
};
