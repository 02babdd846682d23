//! Tombstone registry
//!
//! A tombstone remembers the timestamp at which a link was removed so that
//! creations carrying an older or equal timestamp are rejected. Tombstones
//! are evicted once they are older than the configured retention.

use linkstate_core::{LinkKey, Timestamp};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tombstone {
    timestamp: Timestamp,
    recorded_at: Instant,
}

/// Removal timestamps by link, with the instant each was recorded
#[derive(Debug, Clone, Default)]
pub struct TombstoneRegistry {
    entries: HashMap<LinkKey, Tombstone>,
}

impl TombstoneRegistry {
    /// Removal timestamp for `key`
    pub fn get(&self, key: &LinkKey) -> Option<Timestamp> {
        self.entries.get(key).map(|tombstone| tombstone.timestamp)
    }

    /// Whether a creation at `timestamp` must be rejected
    pub fn blocks(&self, key: &LinkKey, timestamp: Timestamp) -> bool {
        self.get(key)
            .is_some_and(|removed_at| !timestamp.is_newer_than(&removed_at))
    }

    /// Record a removal, keeping the newer timestamp if one already exists
    pub fn record(&mut self, key: &LinkKey, timestamp: Timestamp, now: Instant) {
        match self.entries.get_mut(key) {
            Some(existing) if !timestamp.is_newer_than(&existing.timestamp) => {}
            Some(existing) => {
                existing.timestamp = timestamp;
                existing.recorded_at = now;
            }
            None => {
                self.entries.insert(
                    key.clone(),
                    Tombstone {
                        timestamp,
                        recorded_at: now,
                    },
                );
            }
        }
    }

    /// Forget the tombstone, returning its timestamp
    pub fn clear(&mut self, key: &LinkKey) -> Option<Timestamp> {
        self.entries.remove(key).map(|tombstone| tombstone.timestamp)
    }

    /// Number of tombstones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No tombstones are held
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every key with its removal timestamp
    pub fn iter(&self) -> impl Iterator<Item = (&LinkKey, Timestamp)> {
        self.entries
            .iter()
            .map(|(key, tombstone)| (key, tombstone.timestamp))
    }

    /// Evict tombstones recorded more than `retention` before `now`
    pub fn purge(&mut self, now: Instant, retention: Duration) -> Vec<LinkKey> {
        let mut evicted = Vec::new();
        self.entries.retain(|key, tombstone| {
            let expired = now.saturating_duration_since(tombstone.recorded_at) > retention;
            if expired {
                evicted.push(key.clone());
            }
            !expired
        });
        evicted
    }
}
