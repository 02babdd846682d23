//! Topology delegate
//!
//! Receives every link event the store produces, whether it came from a local
//! provider, a peer's gossip or an anti-entropy exchange.

use crate::types::LinkEvent;
use std::sync::Arc;

/// Receiver of link events
pub trait LinkStoreDelegate: Send + Sync {
    /// Called after the mutation producing `event` has committed
    fn notify(&self, event: &LinkEvent);
}

impl<T: LinkStoreDelegate + ?Sized> LinkStoreDelegate for Arc<T> {
    fn notify(&self, event: &LinkEvent) {
        (**self).notify(event);
    }
}

/// Delegate that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelegate;

impl LinkStoreDelegate for NoopDelegate {
    fn notify(&self, _event: &LinkEvent) {}
}
