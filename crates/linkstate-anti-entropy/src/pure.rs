//! Pure advertisement diffing.
//!
//! Given the local and a remote advertisement, decide what the local replica
//! should pull and which remote tombstones it should apply. No I/O and no
//! replica access, so the rules can be tested in isolation.

use crate::wire::{Advertisement, LinkRemoved};
use linkstate_core::{LinkFragmentId, LinkKey, Timestamp};
use std::collections::{BTreeSet, HashMap};

struct LocalView<'a> {
    fragments: HashMap<&'a LinkFragmentId, Timestamp>,
    oldest_fragment: HashMap<&'a LinkKey, Timestamp>,
    tombstones: HashMap<&'a LinkKey, Timestamp>,
}

impl<'a> LocalView<'a> {
    fn new(local: &'a Advertisement) -> Self {
        let mut fragments = HashMap::with_capacity(local.fragments.len());
        let mut oldest_fragment: HashMap<&LinkKey, Timestamp> = HashMap::new();
        for entry in &local.fragments {
            fragments.insert(&entry.fragment, entry.timestamp);
            oldest_fragment
                .entry(entry.fragment.key())
                .and_modify(|ts| *ts = (*ts).min(entry.timestamp))
                .or_insert(entry.timestamp);
        }
        let tombstones = local
            .tombstones
            .iter()
            .map(|entry| (&entry.key, entry.timestamp))
            .collect();

        Self {
            fragments,
            oldest_fragment,
            tombstones,
        }
    }
}

/// Fragments the remote holds at a newer timestamp than the local replica
///
/// A fragment at or below the local tombstone for its link is skipped, unless
/// the same pull also brings a fragment of that link newer than the
/// tombstone. Applied newest first, that fragment clears the tombstone and
/// the older ones merge after it.
pub fn fragments_to_pull(local: &Advertisement, remote: &Advertisement) -> Vec<LinkFragmentId> {
    let view = LocalView::new(local);

    let candidates: Vec<_> = remote
        .fragments
        .iter()
        .filter(|entry| {
            let known = view.fragments.get(&entry.fragment);
            !known.is_some_and(|local_ts| !entry.timestamp.is_newer_than(local_ts))
        })
        .collect();

    let mut newest: HashMap<&LinkKey, Timestamp> = HashMap::new();
    for &entry in &candidates {
        newest
            .entry(entry.fragment.key())
            .and_modify(|ts| *ts = (*ts).max(entry.timestamp))
            .or_insert(entry.timestamp);
    }

    let pulls: BTreeSet<&LinkFragmentId> = candidates
        .into_iter()
        .filter(|entry| {
            let key = entry.fragment.key();
            match view.tombstones.get(key) {
                None => true,
                Some(removed_at) => newest
                    .get(key)
                    .is_some_and(|ts| ts.is_newer_than(removed_at)),
            }
        })
        .map(|entry| &entry.fragment)
        .collect();

    pulls.into_iter().cloned().collect()
}

/// Remote tombstones that could change local state
///
/// Skipped when the local tombstone is at least as new, or when every local
/// fragment of the link is at least as new (the removal would be stale).
pub fn tombstones_to_apply(local: &Advertisement, remote: &Advertisement) -> Vec<LinkRemoved> {
    let view = LocalView::new(local);

    remote
        .tombstones
        .iter()
        .filter(|entry| {
            let local_tombstone = view.tombstones.get(&entry.key);
            if local_tombstone.is_some_and(|ts| !entry.timestamp.is_newer_than(ts)) {
                return false;
            }
            let oldest = view.oldest_fragment.get(&entry.key);
            !oldest.is_some_and(|ts| !entry.timestamp.is_newer_than(ts))
        })
        .map(|entry| LinkRemoved::new(entry.key.clone(), entry.timestamp))
        .collect()
}
