//! Single-replica behaviour of the link store: event rules, composition,
//! stale-write rejection, tombstones and index queries.

mod common;

use common::{manual_config, single, start_replica};
use linkstate_anti_entropy::{LinkRemoved, LinkUpdate, ReplicaEffects};
use linkstate_core::{DeviceId, LinkEventKind, LinkFragmentId, LinkStoreError, LinkType};
use linkstate_testkit::fixtures::{
    ancillary_provider, cp, direct, indirect, key, primary_provider, secondary_provider, stamped,
    ts,
};
use linkstate_testkit::{ManualClock, MemoryCluster};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn provider_walkthrough_follows_event_rules() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let store = &replica.store;
    let (a1, b2) = (cp("A", 1), cp("B", 2));

    clock.set(1);
    let event = store
        .create_or_update_link(&primary_provider(), indirect(a1.clone(), b2.clone()))
        .unwrap()
        .unwrap();
    assert_eq!(event.kind(), LinkEventKind::Added);
    assert_eq!(event.link().link_type(), LinkType::Indirect);

    clock.set(2);
    let event = store
        .create_or_update_link(&primary_provider(), direct(a1.clone(), b2.clone()))
        .unwrap()
        .unwrap();
    assert_eq!(event.kind(), LinkEventKind::Updated);
    assert_eq!(event.link().link_type(), LinkType::Direct);

    clock.set(3);
    let optical = direct(a1.clone(), b2.clone()).with_annotation("bandwidth", "10G");
    let event = store
        .create_or_update_link(&ancillary_provider(), optical)
        .unwrap()
        .unwrap();
    assert_eq!(event.kind(), LinkEventKind::Updated);
    assert_eq!(
        event.link().annotations().get("bandwidth").map(String::as_str),
        Some("10G")
    );
    assert_eq!(event.link().provider_id(), &primary_provider());

    clock.set(4);
    let event = store.remove_link(&a1, &b2).unwrap().unwrap();
    assert_eq!(event.kind(), LinkEventKind::Removed);
    assert!(store.get_link(&a1, &b2).is_none());
    assert_eq!(store.tombstone(&key(a1.clone(), b2.clone())), Some(ts(4)));

    // Predates the removal
    clock.set(3);
    let stale = store
        .create_or_update_link(&primary_provider(), direct(a1.clone(), b2.clone()))
        .unwrap();
    assert!(stale.is_none());
    assert!(store.get_link(&a1, &b2).is_none());

    clock.set(5);
    let event = store
        .create_or_update_link(&primary_provider(), direct(a1.clone(), b2.clone()))
        .unwrap()
        .unwrap();
    assert_eq!(event.kind(), LinkEventKind::Added);
    assert_eq!(store.tombstone(&key(a1, b2)), None);

    assert_eq!(
        replica.events.kinds(),
        vec![
            LinkEventKind::Added,
            LinkEventKind::Updated,
            LinkEventKind::Updated,
            LinkEventKind::Removed,
            LinkEventKind::Added,
        ]
    );
}

#[tokio::test]
async fn older_fragment_never_overwrites_newer() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let (a1, b2) = (cp("A", 1), cp("B", 2));

    let newer = direct(a1.clone(), b2.clone()).with_annotation("latency", "3ms");
    let older = indirect(a1.clone(), b2.clone());
    assert!(replica
        .store
        .apply_update(LinkUpdate::new(primary_provider(), stamped(newer, 7)))
        .is_some());
    assert!(replica
        .store
        .apply_update(LinkUpdate::new(primary_provider(), stamped(older, 5)))
        .is_none());

    let link = replica.store.get_link(&a1, &b2).unwrap();
    assert_eq!(link.link_type(), LinkType::Direct);
    assert_eq!(link.annotations().get("latency").map(String::as_str), Some("3ms"));

    let fragment = LinkFragmentId::new(key(a1, b2), primary_provider());
    assert_eq!(
        replica.store.get_fragment(&fragment).map(|f| f.timestamp()),
        Some(ts(7))
    );
}

#[tokio::test]
async fn reapplying_an_update_is_silent() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let update = LinkUpdate::new(primary_provider(), stamped(direct(cp("A", 1), cp("B", 1)), 3));

    assert!(replica.store.apply_update(update.clone()).is_some());
    assert!(replica.store.apply_update(update).is_none());
    assert_eq!(replica.events.count(LinkEventKind::Added), 1);
    assert_eq!(replica.store.get_link_count(), 1);
}

#[tokio::test]
async fn downgrade_is_stored_without_event() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let (a1, b1) = (cp("A", 1), cp("B", 1));

    replica
        .store
        .create_or_update_link(&primary_provider(), direct(a1.clone(), b1.clone()))
        .unwrap();
    let event = replica
        .store
        .create_or_update_link(&primary_provider(), indirect(a1.clone(), b1.clone()))
        .unwrap();

    assert!(event.is_none());
    assert_eq!(
        replica.store.get_link(&a1, &b1).unwrap().link_type(),
        LinkType::Indirect
    );
}

#[tokio::test]
async fn annotation_change_alone_is_an_update() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let (a1, b1) = (cp("A", 1), cp("B", 1));

    replica
        .store
        .create_or_update_link(
            &primary_provider(),
            direct(a1.clone(), b1.clone()).with_annotation("cost", "10"),
        )
        .unwrap();
    let event = replica
        .store
        .create_or_update_link(
            &primary_provider(),
            direct(a1.clone(), b1.clone()).with_annotation("cost", "20"),
        )
        .unwrap()
        .unwrap();

    assert_eq!(event.kind(), LinkEventKind::Updated);
    assert_eq!(event.link().annotations().get("cost").map(String::as_str), Some("20"));

    // Same content again: nothing visible changes
    let event = replica
        .store
        .create_or_update_link(
            &primary_provider(),
            direct(a1, b1).with_annotation("cost", "20"),
        )
        .unwrap();
    assert!(event.is_none());
}

#[tokio::test]
async fn primary_annotations_win_and_others_fill_gaps() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let (a1, b1) = (cp("A", 1), cp("B", 1));

    replica
        .store
        .create_or_update_link(
            &ancillary_provider(),
            indirect(a1.clone(), b1.clone())
                .with_annotation("cost", "99")
                .with_annotation("bandwidth", "40G"),
        )
        .unwrap();
    let link = replica.store.get_link(&a1, &b1).unwrap();
    assert_eq!(link.provider_id(), &ancillary_provider());

    replica
        .store
        .create_or_update_link(
            &secondary_provider(),
            direct(a1.clone(), b1.clone()).with_annotation("cost", "5"),
        )
        .unwrap();
    replica
        .store
        .create_or_update_link(
            &primary_provider(),
            direct(a1.clone(), b1.clone()).with_annotation("cost", "1"),
        )
        .unwrap();

    // "bgpls" orders before "lldp", so it is the primary
    let link = replica.store.get_link(&a1, &b1).unwrap();
    assert_eq!(link.provider_id(), &secondary_provider());
    assert_eq!(link.link_type(), LinkType::Direct);
    assert_eq!(link.annotations().get("cost").map(String::as_str), Some("5"));
    assert_eq!(
        link.annotations().get("bandwidth").map(String::as_str),
        Some("40G")
    );
}

#[tokio::test]
async fn removal_must_be_newer_than_primary() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let (a1, b1) = (cp("A", 1), cp("B", 1));

    clock.set(5);
    replica
        .store
        .create_or_update_link(&primary_provider(), direct(a1.clone(), b1.clone()))
        .unwrap();

    clock.set(3);
    assert!(replica.store.remove_link(&a1, &b1).unwrap().is_none());
    assert!(replica.store.get_link(&a1, &b1).is_some());
    assert_eq!(replica.store.tombstone_count(), 0);

    // Equal timestamp loses too
    let tie = LinkRemoved::new(key(a1.clone(), b1.clone()), ts(5));
    assert!(replica.store.apply_removal(tie).is_none());
    assert!(replica.store.get_link(&a1, &b1).is_some());
}

#[tokio::test]
async fn removing_unknown_link_leaves_tombstone() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let (a1, b1) = (cp("A", 1), cp("B", 1));

    clock.set(10);
    assert!(replica.store.remove_link(&a1, &b1).unwrap().is_none());
    assert_eq!(replica.store.tombstone(&key(a1.clone(), b1.clone())), Some(ts(10)));
    assert!(replica.events.events().is_empty());

    // A create issued before the removal arrives late and is rejected
    let late = LinkUpdate::new(primary_provider(), stamped(direct(a1.clone(), b1.clone()), 8));
    assert!(replica.store.apply_update(late).is_none());
    assert!(replica.store.get_link(&a1, &b1).is_none());
}

#[tokio::test]
async fn removal_clears_every_provider() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let (a1, b1) = (cp("A", 1), cp("B", 1));

    replica
        .store
        .create_or_update_link(&primary_provider(), direct(a1.clone(), b1.clone()))
        .unwrap();
    replica
        .store
        .create_or_update_link(&ancillary_provider(), direct(a1.clone(), b1.clone()))
        .unwrap();
    replica.store.remove_link(&a1, &b1).unwrap().unwrap();

    for provider in [primary_provider(), ancillary_provider()] {
        let fragment = LinkFragmentId::new(key(a1.clone(), b1.clone()), provider);
        assert!(replica.store.get_fragment(&fragment).is_none());
    }
}

#[tokio::test]
async fn invalid_descriptions_are_rejected() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);

    let result = replica
        .store
        .create_or_update_link(&primary_provider(), direct(cp("A", 1), cp("A", 1)));
    assert!(matches!(result, Err(LinkStoreError::InvalidDescription { .. })));
    assert_eq!(replica.store.get_link_count(), 0);

    // Malformed remote updates are dropped rather than applied
    let remote = LinkUpdate::new(primary_provider(), stamped(direct(cp("A", 1), cp("A", 1)), 4));
    assert!(replica.store.apply_update(remote).is_none());
    assert_eq!(replica.store.get_link_count(), 0);
}

#[tokio::test]
async fn clock_failure_changes_nothing() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    clock.set_unavailable(true);

    let result = replica
        .store
        .create_or_update_link(&primary_provider(), direct(cp("A", 1), cp("B", 1)));
    assert!(matches!(result, Err(LinkStoreError::Clock(_))));
    assert!(matches!(
        replica.store.remove_link(&cp("A", 1), &cp("B", 1)),
        Err(LinkStoreError::Clock(_))
    ));
    assert_eq!(replica.store.get_link_count(), 0);
    assert_eq!(replica.store.tombstone_count(), 0);
    assert!(replica.events.events().is_empty());
}

#[tokio::test]
async fn indices_track_links() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let store = &replica.store;

    for (src, dst) in [
        (cp("A", 1), cp("B", 1)),
        (cp("A", 2), cp("C", 1)),
        (cp("B", 2), cp("A", 3)),
    ] {
        store
            .create_or_update_link(&primary_provider(), direct(src, dst))
            .unwrap();
    }

    let a = DeviceId::new("A");
    assert_eq!(store.get_device_egress_links(&a).len(), 2);
    assert_eq!(store.get_device_ingress_links(&a).len(), 1);
    assert_eq!(store.get_egress_links(&cp("A", 2)).len(), 1);
    assert_eq!(store.get_egress_links(&cp("A", 3)).len(), 0);
    assert_eq!(store.get_ingress_links(&cp("A", 3)).len(), 1);
    assert_eq!(store.get_links().len(), store.get_link_count());

    store.remove_link(&cp("A", 1), &cp("B", 1)).unwrap();
    let egress = store.get_device_egress_links(&a);
    assert_eq!(egress.len(), 1);
    assert_eq!(egress[0].dst(), &cp("C", 1));
    assert!(store.get_device_ingress_links(&DeviceId::new("B")).is_empty());
    assert!(store.get_device_egress_links(&DeviceId::new("Z")).is_empty());

    for link in store.get_links() {
        assert!(store
            .get_device_egress_links(link.src().device_id())
            .contains(&link));
        assert!(store
            .get_device_ingress_links(link.dst().device_id())
            .contains(&link));
    }
}

#[tokio::test]
async fn advertisement_lists_fragments_and_tombstones() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);

    replica
        .store
        .create_or_update_link(&primary_provider(), direct(cp("A", 1), cp("B", 1)))
        .unwrap();
    replica
        .store
        .create_or_update_link(&ancillary_provider(), direct(cp("A", 1), cp("B", 1)))
        .unwrap();
    replica
        .store
        .remove_link(&cp("C", 1), &cp("D", 1))
        .unwrap();

    let advertisement = replica.store.advertisement();
    assert_eq!(advertisement.sender.as_str(), "solo");
    assert_eq!(advertisement.fragments.len(), 2);
    assert_eq!(advertisement.tombstones.len(), 1);
    assert_eq!(advertisement.tombstones[0].key, key(cp("C", 1), cp("D", 1)));
}

#[tokio::test(start_paused = true)]
async fn expired_tombstones_are_purged() {
    let clock = Arc::new(ManualClock::new());
    let cluster = MemoryCluster::new();
    let mut config = manual_config();
    config.tombstones.retention_ms = 20_000;
    config.tombstones.purge_interval_ms = 600_000;
    let replica = start_replica(&cluster, "solo", &clock, config);
    let (a1, b1) = (cp("A", 1), cp("B", 1));

    clock.set(2);
    replica
        .store
        .create_or_update_link(&primary_provider(), direct(a1.clone(), b1.clone()))
        .unwrap();
    clock.set(4);
    replica.store.remove_link(&a1, &b1).unwrap();

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(replica.store.purge_tombstones(), 0);
    assert_eq!(replica.store.tombstone_count(), 1);

    tokio::time::advance(Duration::from_secs(15)).await;
    assert_eq!(replica.store.purge_tombstones(), 1);
    assert_eq!(replica.store.tombstone_count(), 0);
    assert!(replica.store.advertisement().is_empty());

    // Without the tombstone a stale create is accepted again
    clock.set(3);
    let event = replica
        .store
        .create_or_update_link(&primary_provider(), direct(a1, b1))
        .unwrap();
    assert_eq!(event.map(|e| e.kind()), Some(LinkEventKind::Added));
}

#[tokio::test]
async fn stopped_store_rejects_mutations() {
    let clock = Arc::new(ManualClock::new());
    let (_cluster, replica) = single(&clock);
    let handle = Arc::clone(replica.store.store());

    replica.store.stop().await;

    let result = handle.create_or_update_link(&primary_provider(), direct(cp("A", 1), cp("B", 1)));
    assert!(matches!(result, Err(LinkStoreError::NotRunning)));
    assert!(matches!(
        handle.remove_link(&cp("A", 1), &cp("B", 1)),
        Err(LinkStoreError::NotRunning)
    ));
}
