//! Delegate that records every event it is handed

use linkstate_core::effects::LinkStoreDelegate;
use linkstate_core::{LinkEvent, LinkEventKind};
use parking_lot::Mutex;

/// Collects events in arrival order
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<LinkEvent>>,
}

impl RecordingDelegate {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event seen so far
    pub fn events(&self) -> Vec<LinkEvent> {
        self.events.lock().clone()
    }

    /// Remove and return every event seen so far
    pub fn take(&self) -> Vec<LinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Kinds of the recorded events, in order
    pub fn kinds(&self) -> Vec<LinkEventKind> {
        self.events.lock().iter().map(LinkEvent::kind).collect()
    }

    /// Number of recorded events of `kind`
    pub fn count(&self, kind: LinkEventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }
}

impl LinkStoreDelegate for RecordingDelegate {
    fn notify(&self, event: &LinkEvent) {
        self.events.lock().push(event.clone());
    }
}
