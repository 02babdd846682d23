//! Anti-entropy runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduling and timeout parameters for anti-entropy rounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiEntropyConfig {
    /// Run the periodic background loop
    pub enabled: bool,
    /// Delay before the first round after start
    pub initial_delay_ms: u64,
    /// Base period between rounds
    pub interval_ms: u64,
    /// Upper bound of the random delay added to each period
    pub jitter_ms: u64,
    /// Bound on one complete exchange with one peer
    pub exchange_timeout_ms: u64,
}

impl Default for AntiEntropyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 5_000,
            interval_ms: 5_000,
            jitter_ms: 1_000,
            exchange_timeout_ms: 1_000,
        }
    }
}

impl AntiEntropyConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }
}
