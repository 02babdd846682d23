//! The gossip-replicated link store
//!
//! # Locking
//!
//! - `descriptors` maps each link to its own mutex; holding that mutex is the
//!   per-link critical section. The outer map lock is only held long enough to
//!   find or insert the entry.
//! - `tables` holds the composed links, indices and tombstones behind one
//!   reader-writer lock, so a reader always sees them mutually consistent.
//!
//! Lock order is link mutex, then `tables`. Tombstone purging takes the
//! outer `descriptors` lock before `tables` and only touches entries no one
//! else holds. Clock calls happen before any lock; gossip is queued after
//! every lock is released.

use crate::descriptors::ProviderDescriptors;
use crate::indices::LinkIndices;
use crate::tombstones::TombstoneRegistry;
use linkstate_anti_entropy::{
    Advertisement, FragmentTimestamp, GossipBroadcaster, LinkRemoved, LinkUpdate, ReplicaEffects,
    TombstoneTimestamp,
};
use linkstate_core::effects::{ClockEffects, LinkStoreDelegate};
use linkstate_core::{
    ConnectPoint, DeviceId, Link, LinkDescription, LinkEvent, LinkFragmentId, LinkKey,
    LinkStoreError, LinkStoreResult, LinkType, NodeId, ProviderId, Timestamp, Timestamped,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

type KeyLock = Arc<Mutex<ProviderDescriptors>>;

#[derive(Debug, Default)]
struct LinkTables {
    links: BTreeMap<LinkKey, Link>,
    indices: LinkIndices,
    tombstones: TombstoneRegistry,
}

/// One replica of the cluster-wide link inventory
///
/// Local providers call [`create_or_update_link`](Self::create_or_update_link)
/// and [`remove_link`](Self::remove_link); peers reach the same merge logic
/// through [`ReplicaEffects`]. Every resulting event is handed to the
/// delegate. Only local mutations are gossiped.
pub struct GossipLinkStore {
    node: NodeId,
    clock: Arc<dyn ClockEffects>,
    delegate: Arc<dyn LinkStoreDelegate>,
    gossip: GossipBroadcaster,
    tombstone_retention: Duration,
    running: AtomicBool,
    descriptors: RwLock<HashMap<LinkKey, KeyLock>>,
    tables: RwLock<LinkTables>,
}

impl GossipLinkStore {
    /// Running replica with empty tables
    ///
    /// Normally built by [`LinkStore::start`](crate::LinkStore::start), which
    /// also wires gossip and anti-entropy.
    pub fn new(
        node: NodeId,
        clock: Arc<dyn ClockEffects>,
        delegate: Arc<dyn LinkStoreDelegate>,
        gossip: GossipBroadcaster,
        tombstone_retention: Duration,
    ) -> Self {
        Self {
            node,
            clock,
            delegate,
            gossip,
            tombstone_retention,
            running: AtomicBool::new(true),
            descriptors: RwLock::new(HashMap::new()),
            tables: RwLock::new(LinkTables::default()),
        }
    }

    /// Identity of the node hosting this replica
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub(crate) fn mark_stopped(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn ensure_running(&self) -> LinkStoreResult<()> {
        if self.running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(LinkStoreError::NotRunning)
        }
    }

    // ---- Mutations ----

    /// Record `provider`'s view of a link
    ///
    /// Returns the resulting event, or `None` when the description is stale
    /// (not newer than the provider's entry or the link's tombstone) or
    /// changes nothing visible.
    pub fn create_or_update_link(
        &self,
        provider: &ProviderId,
        description: LinkDescription,
    ) -> LinkStoreResult<Option<LinkEvent>> {
        self.ensure_running()?;
        description.validate()?;
        let timestamp = self.clock.now(description.dst().device_id())?;

        let update = LinkUpdate::new(provider.clone(), Timestamped::new(description, timestamp));
        let event = self.apply_update_internal(&update);
        if let Some(event) = &event {
            self.gossip.publish_update(&update);
            self.delegate.notify(event);
        }
        Ok(event)
    }

    /// Remove the link `src -> dst`
    ///
    /// Accepted only when the removal is newer than the primary provider's
    /// entry. Returns `None` for unknown or newer links.
    pub fn remove_link(
        &self,
        src: &ConnectPoint,
        dst: &ConnectPoint,
    ) -> LinkStoreResult<Option<LinkEvent>> {
        self.ensure_running()?;
        let timestamp = self.clock.now(dst.device_id())?;

        let removal = LinkRemoved::new(LinkKey::new(src.clone(), dst.clone()), timestamp);
        let event = self.apply_removal_internal(&removal);
        if let Some(event) = &event {
            self.gossip.publish_removal(&removal);
            self.delegate.notify(event);
        }
        Ok(event)
    }

    fn key_lock(&self, key: &LinkKey) -> KeyLock {
        if let Some(lock) = self.descriptors.read().get(key) {
            return Arc::clone(lock);
        }
        Arc::clone(self.descriptors.write().entry(key.clone()).or_default())
    }

    fn existing_key_lock(&self, key: &LinkKey) -> Option<KeyLock> {
        self.descriptors.read().get(key).cloned()
    }

    fn apply_update_internal(&self, update: &LinkUpdate) -> Option<LinkEvent> {
        let key = update.key();
        let timestamp = update.timestamp();
        let lock = self.key_lock(&key);
        let mut descs = lock.lock();

        if self.tables.read().tombstones.blocks(&key, timestamp) {
            tracing::trace!(link = %key, %timestamp, "Update predates tombstone");
            return None;
        }
        if !descs.offer(&update.provider_id, update.description.clone()) {
            tracing::trace!(
                link = %key,
                provider = %update.provider_id,
                %timestamp,
                "Stale update ignored"
            );
            return None;
        }
        let link = descs.compose()?;

        let previous = {
            let mut tables = self.tables.write();
            tables.tombstones.clear(&key);
            let previous = tables.links.insert(key.clone(), link.clone());
            if previous.is_none() {
                tables.indices.insert(&key);
            }
            previous
        };
        drop(descs);

        let event = match previous {
            None => Some(LinkEvent::added(link)),
            Some(previous) if is_visible_change(&previous, &link) => Some(LinkEvent::updated(link)),
            Some(_) => None,
        };
        tracing::debug!(
            link = %key,
            provider = %update.provider_id,
            %timestamp,
            event = ?event.as_ref().map(LinkEvent::kind),
            "Update accepted"
        );
        event
    }

    fn apply_removal_internal(&self, removal: &LinkRemoved) -> Option<LinkEvent> {
        let key = &removal.key;
        let timestamp = removal.timestamp;
        let lock = self.key_lock(key);
        let mut descs = lock.lock();

        match descs.primary_timestamp() {
            None => {
                // Nothing known locally; keep the timestamp so stale creations
                // arriving later are still rejected.
                self.tables
                    .write()
                    .tombstones
                    .record(key, timestamp, Instant::now());
                tracing::trace!(link = %key, %timestamp, "Tombstone recorded for unknown link");
                return None;
            }
            Some(primary) if !timestamp.is_newer_than(&primary) => {
                tracing::trace!(link = %key, %timestamp, %primary, "Stale removal ignored");
                return None;
            }
            Some(_) => {}
        }

        descs.clear();
        let removed = {
            let mut tables = self.tables.write();
            tables.tombstones.record(key, timestamp, Instant::now());
            let removed = tables.links.remove(key);
            if removed.is_some() {
                tables.indices.remove(key);
            }
            removed
        };
        drop(descs);

        tracing::debug!(link = %key, %timestamp, "Removal accepted");
        removed.map(LinkEvent::removed)
    }

    // ---- Queries ----

    /// Composed link `src -> dst`, if present
    pub fn get_link(&self, src: &ConnectPoint, dst: &ConnectPoint) -> Option<Link> {
        let key = LinkKey::new(src.clone(), dst.clone());
        self.tables.read().links.get(&key).cloned()
    }

    /// Snapshot of every link, ordered by key
    pub fn get_links(&self) -> Vec<Link> {
        self.tables.read().links.values().cloned().collect()
    }

    /// Number of links
    pub fn get_link_count(&self) -> usize {
        self.tables.read().links.len()
    }

    /// Links leaving `device`
    pub fn get_device_egress_links(&self, device: &DeviceId) -> Vec<Link> {
        let tables = self.tables.read();
        resolve(&tables, tables.indices.egress(device))
    }

    /// Links arriving at `device`
    pub fn get_device_ingress_links(&self, device: &DeviceId) -> Vec<Link> {
        let tables = self.tables.read();
        resolve(&tables, tables.indices.ingress(device))
    }

    /// Links leaving exactly `point`
    pub fn get_egress_links(&self, point: &ConnectPoint) -> Vec<Link> {
        let tables = self.tables.read();
        let keys = tables
            .indices
            .egress(point.device_id())
            .filter(|key| key.src() == point);
        resolve(&tables, keys)
    }

    /// Links arriving at exactly `point`
    pub fn get_ingress_links(&self, point: &ConnectPoint) -> Vec<Link> {
        let tables = self.tables.read();
        let keys = tables
            .indices
            .ingress(point.device_id())
            .filter(|key| key.dst() == point);
        resolve(&tables, keys)
    }

    /// One provider's current description of a link
    pub fn get_fragment(&self, id: &LinkFragmentId) -> Option<Timestamped<LinkDescription>> {
        let lock = self.existing_key_lock(id.key())?;
        let descs = lock.lock();
        descs.get(id.provider_id()).cloned()
    }

    /// Removal timestamp recorded for `key`
    pub fn tombstone(&self, key: &LinkKey) -> Option<Timestamp> {
        self.tables.read().tombstones.get(key)
    }

    /// Number of tombstones currently held
    pub fn tombstone_count(&self) -> usize {
        self.tables.read().tombstones.len()
    }

    // ---- Maintenance ----

    /// Evict tombstones older than the retention period
    ///
    /// Returns how many were evicted. Per-link entries left empty are
    /// released too.
    pub fn purge_tombstones(&self) -> usize {
        let mut descriptors = self.descriptors.write();
        let mut tables = self.tables.write();

        let evicted = tables
            .tombstones
            .purge(Instant::now(), self.tombstone_retention);

        // An entry whose Arc is unshared cannot be locked by anyone else.
        descriptors.retain(|key, lock| {
            Arc::strong_count(lock) > 1
                || tables.tombstones.get(key).is_some()
                || !lock.lock().is_empty()
        });

        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "Purged expired tombstones");
        }
        evicted.len()
    }

    /// Snapshot of every fragment and tombstone timestamp
    pub fn advertisement(&self) -> Advertisement {
        let mut advertisement = Advertisement::new(self.node.clone());

        let locks: Vec<(LinkKey, KeyLock)> = self
            .descriptors
            .read()
            .iter()
            .map(|(key, lock)| (key.clone(), Arc::clone(lock)))
            .collect();
        for (key, lock) in locks {
            let descs = lock.lock();
            for (provider, description) in descs.iter() {
                advertisement.fragments.push(FragmentTimestamp {
                    fragment: LinkFragmentId::new(key.clone(), provider.clone()),
                    timestamp: description.timestamp(),
                });
            }
        }

        advertisement.tombstones = self
            .tables
            .read()
            .tombstones
            .iter()
            .map(|(key, timestamp)| TombstoneTimestamp {
                key: key.clone(),
                timestamp,
            })
            .collect();
        advertisement
    }
}

/// UPDATED is emitted for an INDIRECT -> DIRECT upgrade or changed
/// annotations; a downgrade or a primary change alone stays silent.
fn is_visible_change(previous: &Link, current: &Link) -> bool {
    let upgraded =
        previous.link_type() == LinkType::Indirect && current.link_type() == LinkType::Direct;
    upgraded || previous.annotations() != current.annotations()
}

fn resolve<'a>(tables: &LinkTables, keys: impl Iterator<Item = &'a LinkKey>) -> Vec<Link> {
    keys.filter_map(|key| tables.links.get(key).cloned())
        .collect()
}

impl ReplicaEffects for GossipLinkStore {
    fn advertisement(&self) -> Advertisement {
        GossipLinkStore::advertisement(self)
    }

    fn fragments(&self, ids: &[LinkFragmentId]) -> Vec<LinkUpdate> {
        ids.iter()
            .filter_map(|id| {
                self.get_fragment(id)
                    .map(|description| LinkUpdate::new(id.provider_id().clone(), description))
            })
            .collect()
    }

    fn apply_update(&self, update: LinkUpdate) -> Option<LinkEvent> {
        if let Err(e) = update.description.value().validate() {
            tracing::warn!(link = %update.key(), error = %e, "Rejecting malformed remote update");
            return None;
        }
        let event = self.apply_update_internal(&update)?;
        self.delegate.notify(&event);
        Some(event)
    }

    fn apply_removal(&self, removal: LinkRemoved) -> Option<LinkEvent> {
        let event = self.apply_removal_internal(&removal)?;
        self.delegate.notify(&event);
        Some(event)
    }
}
