//! Link store configuration
//!
//! ```toml
//! [anti_entropy]
//! enabled = true
//! initial_delay_ms = 5000
//! interval_ms = 5000
//! jitter_ms = 1000
//! exchange_timeout_ms = 1000
//!
//! [gossip]
//! queue_capacity = 1024
//!
//! [tombstones]
//! retention_ms = 86400000
//! purge_interval_ms = 60000
//! ```

use linkstate_anti_entropy::{AntiEntropyConfig, BroadcastConfig};
use linkstate_core::config::{ConfigValidator, LinkStateConfig, ValidationResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tombstone retention policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TombstoneConfig {
    /// Age after which a tombstone is evicted
    pub retention_ms: u64,
    /// Period of the eviction task
    pub purge_interval_ms: u64,
}

impl Default for TombstoneConfig {
    fn default() -> Self {
        Self {
            retention_ms: 24 * 60 * 60 * 1000,
            purge_interval_ms: 60_000,
        }
    }
}

impl TombstoneConfig {
    /// Retention as a duration
    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// Purge period as a duration
    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }
}

/// Complete configuration of one link store replica
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkStoreConfig {
    /// Anti-entropy scheduling
    pub anti_entropy: AntiEntropyConfig,
    /// Outbound gossip queue
    pub gossip: BroadcastConfig,
    /// Tombstone retention
    pub tombstones: TombstoneConfig,
}

impl LinkStateConfig for LinkStoreConfig {
    fn validate(&self) -> ValidationResult {
        let root = ConfigValidator::new();

        let ae = &self.anti_entropy;
        let mut anti_entropy = root.for_field("anti_entropy");
        anti_entropy
            .positive("interval_ms", ae.interval_ms)
            .positive("exchange_timeout_ms", ae.exchange_timeout_ms)
            .custom(
                "exchange_timeout_ms",
                ae,
                |ae| ae.exchange_timeout_ms < ae.interval_ms,
                "must be shorter than interval_ms",
            );

        let mut gossip = root.for_field("gossip");
        gossip.positive("queue_capacity", self.gossip.queue_capacity as u64);

        let ts = &self.tombstones;
        let mut tombstones = root.for_field("tombstones");
        tombstones
            .positive("retention_ms", ts.retention_ms)
            .positive("purge_interval_ms", ts.purge_interval_ms)
            .custom(
                "retention_ms",
                &(ts.retention_ms, ae.interval_ms),
                |(retention, interval)| *retention >= interval.saturating_mul(2),
                "must cover at least two anti-entropy intervals",
            );

        let mut root = root;
        root.merge(anti_entropy);
        root.merge(gossip);
        root.merge(tombstones);
        root.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LinkStoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.anti_entropy.interval_ms, 5_000);
        assert_eq!(config.tombstones.retention(), Duration::from_secs(86_400));
    }

    #[test]
    fn timeout_must_be_shorter_than_interval() {
        let mut config = LinkStoreConfig::default();
        config.anti_entropy.exchange_timeout_ms = config.anti_entropy.interval_ms;

        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), "anti_entropy.exchange_timeout_ms");
    }

    #[test]
    fn retention_must_outlive_two_rounds() {
        let mut config = LinkStoreConfig::default();
        config.tombstones.retention_ms = config.anti_entropy.interval_ms;

        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), "tombstones.retention_ms");
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let mut config = LinkStoreConfig::default();
        config.gossip.queue_capacity = 0;

        assert_eq!(config.validate().unwrap_err().field(), "gossip.queue_capacity");
    }
}
