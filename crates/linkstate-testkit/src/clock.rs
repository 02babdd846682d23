//! Manually driven clock
//!
//! Every `now` call returns the current sequence and then advances it by one,
//! so a single clock shared between replicas never issues the same timestamp
//! twice. Tests pin specific values with [`ManualClock::set`].

use linkstate_core::effects::{ClockEffects, ClockError};
use linkstate_core::{DeviceId, Timestamp};
use parking_lot::Mutex;

#[derive(Debug)]
struct ClockState {
    next: u64,
    unavailable: bool,
}

/// Deterministic [`ClockEffects`] for tests
#[derive(Debug)]
pub struct ManualClock {
    term: u64,
    state: Mutex<ClockState>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Clock in term 1 whose first timestamp has sequence 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Clock whose first timestamp has the given sequence
    pub fn starting_at(sequence: u64) -> Self {
        Self {
            term: 1,
            state: Mutex::new(ClockState {
                next: sequence,
                unavailable: false,
            }),
        }
    }

    /// Make the next `now` return `sequence`
    pub fn set(&self, sequence: u64) {
        self.state.lock().next = sequence;
    }

    /// Skip `steps` sequence values
    pub fn advance(&self, steps: u64) {
        let mut state = self.state.lock();
        state.next = state.next.saturating_add(steps);
    }

    /// Sequence the next `now` will return
    pub fn peek(&self) -> u64 {
        self.state.lock().next
    }

    /// Timestamp with this clock's term
    pub fn timestamp(&self, sequence: u64) -> Timestamp {
        Timestamp::new(self.term, sequence)
    }

    /// Make `now` fail until re-enabled
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }
}

impl ClockEffects for ManualClock {
    fn now(&self, _device: &DeviceId) -> Result<Timestamp, ClockError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(ClockError::Unavailable {
                reason: "manual clock disabled".to_string(),
            });
        }
        let sequence = state.next;
        state.next = state.next.saturating_add(1);
        Ok(Timestamp::new(self.term, sequence))
    }
}
