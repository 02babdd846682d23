//! Device clock effects
//!
//! Every mutation is stamped with a timestamp obtained from the clock keyed by
//! the link's destination device. The call is bounded and synchronous; it is
//! made before the store enters any critical section.

use crate::time::Timestamp;
use crate::types::DeviceId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Error type for clock operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// This node cannot issue timestamps for the device
    #[error("No timestamp authority for device {device}")]
    NotAuthority {
        /// Device the timestamp was requested for
        device: DeviceId,
    },
    /// Underlying time source failed
    #[error("Clock unavailable: {reason}")]
    Unavailable {
        /// Reason for the failure
        reason: String,
    },
}

/// Source of per-device timestamps
pub trait ClockEffects: Send + Sync {
    /// Next timestamp for a mutation concerning `device`
    fn now(&self, device: &DeviceId) -> Result<Timestamp, ClockError>;
}

/// Blanket implementation for Arc<T> where T: ClockEffects
impl<T: ClockEffects + ?Sized> ClockEffects for Arc<T> {
    fn now(&self, device: &DeviceId) -> Result<Timestamp, ClockError> {
        (**self).now(device)
    }
}

/// Wall-clock backed device clock
///
/// Issues `(term, sequence)` timestamps where the sequence is the current
/// time in microseconds, bumped so that it strictly increases per device even
/// when the wall clock stalls or steps backwards.
#[derive(Debug)]
pub struct DeviceClock {
    term: u64,
    last_issued: Mutex<HashMap<DeviceId, u64>>,
}

impl DeviceClock {
    /// Create a clock issuing timestamps in `term`
    pub fn new(term: u64) -> Self {
        Self {
            term,
            last_issued: Mutex::new(HashMap::new()),
        }
    }

    /// Term stamped on every issued timestamp
    pub fn term(&self) -> u64 {
        self.term
    }
}

impl ClockEffects for DeviceClock {
    #[allow(clippy::disallowed_methods)] // Clock implementation needs SystemTime::now
    fn now(&self, device: &DeviceId) -> Result<Timestamp, ClockError> {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClockError::Unavailable {
                reason: e.to_string(),
            })?;
        let wall_micros = u64::try_from(wall.as_micros()).unwrap_or(u64::MAX);

        let mut last_issued = self.last_issued.lock();
        let last = last_issued.entry(device.clone()).or_insert(0);
        let sequence = wall_micros.max(last.saturating_add(1));
        *last = sequence;

        Ok(Timestamp::new(self.term, sequence))
    }
}
