//! Device-keyed link indices

use linkstate_core::{DeviceId, LinkKey};
use std::collections::{BTreeSet, HashMap};

/// Device -> set of link keys
#[derive(Debug, Clone, Default)]
pub struct DeviceIndex {
    by_device: HashMap<DeviceId, BTreeSet<LinkKey>>,
}

impl DeviceIndex {
    /// Add `key` under `device`
    pub fn insert(&mut self, device: &DeviceId, key: &LinkKey) {
        self.by_device
            .entry(device.clone())
            .or_default()
            .insert(key.clone());
    }

    /// Drop `key` from `device`, forgetting the device once it has no links
    pub fn remove(&mut self, device: &DeviceId, key: &LinkKey) {
        if let Some(keys) = self.by_device.get_mut(device) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_device.remove(device);
            }
        }
    }

    /// Keys indexed under `device`, in key order
    pub fn keys(&self, device: &DeviceId) -> impl Iterator<Item = &LinkKey> {
        self.by_device.get(device).into_iter().flatten()
    }

    /// Number of devices with at least one link
    pub fn device_count(&self) -> usize {
        self.by_device.len()
    }
}

/// Egress (by source device) and ingress (by destination device) indices
#[derive(Debug, Clone, Default)]
pub struct LinkIndices {
    egress: DeviceIndex,
    ingress: DeviceIndex,
}

impl LinkIndices {
    /// Index `key` under both of its devices
    pub fn insert(&mut self, key: &LinkKey) {
        self.egress.insert(key.src().device_id(), key);
        self.ingress.insert(key.dst().device_id(), key);
    }

    /// Remove `key` from both indices
    pub fn remove(&mut self, key: &LinkKey) {
        self.egress.remove(key.src().device_id(), key);
        self.ingress.remove(key.dst().device_id(), key);
    }

    /// Keys whose source is on `device`
    pub fn egress(&self, device: &DeviceId) -> impl Iterator<Item = &LinkKey> {
        self.egress.keys(device)
    }

    /// Keys whose destination is on `device`
    pub fn ingress(&self, device: &DeviceId) -> impl Iterator<Item = &LinkKey> {
        self.ingress.keys(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstate_testkit::fixtures::{cp, key};

    #[test]
    fn links_are_indexed_by_both_endpoints() {
        let mut indices = LinkIndices::default();
        let ab = key(cp("of:a", 1), cp("of:b", 1));
        let ac = key(cp("of:a", 2), cp("of:c", 1));
        indices.insert(&ab);
        indices.insert(&ac);

        let a = DeviceId::new("of:a");
        let b = DeviceId::new("of:b");
        assert_eq!(indices.egress(&a).count(), 2);
        assert_eq!(indices.ingress(&b).collect::<Vec<_>>(), vec![&ab]);
        assert_eq!(indices.ingress(&a).count(), 0);
    }

    #[test]
    fn removal_prunes_empty_devices() {
        let mut index = DeviceIndex::default();
        let device = DeviceId::new("of:a");
        let ab = key(cp("of:a", 1), cp("of:b", 1));

        index.insert(&device, &ab);
        index.remove(&device, &ab);

        assert_eq!(index.device_count(), 0);
        assert_eq!(index.keys(&device).count(), 0);
    }
}
