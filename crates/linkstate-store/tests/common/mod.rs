#![allow(dead_code)]

use linkstate_store::{LinkStore, LinkStoreConfig};
use linkstate_testkit::{init_tracing, ManualClock, MemoryCluster, RecordingDelegate};
use std::sync::Arc;

/// Defaults with the periodic loop off, so tests drive rounds explicitly
pub fn manual_config() -> LinkStoreConfig {
    let mut config = LinkStoreConfig::default();
    config.anti_entropy.enabled = false;
    config.anti_entropy.exchange_timeout_ms = 500;
    config
}

pub struct Replica {
    pub store: LinkStore,
    pub events: Arc<RecordingDelegate>,
}

pub fn start_replica(
    cluster: &MemoryCluster,
    node: &str,
    clock: &Arc<ManualClock>,
    config: LinkStoreConfig,
) -> Replica {
    init_tracing();
    let events = Arc::new(RecordingDelegate::new());
    let store = LinkStore::start(config, clock.clone(), cluster.join(node), events.clone())
        .expect("store starts");
    Replica { store, events }
}

/// Single replica on its own cluster
pub fn single(clock: &Arc<ManualClock>) -> (MemoryCluster, Replica) {
    let cluster = MemoryCluster::new();
    let replica = start_replica(&cluster, "solo", clock, manual_config());
    (cluster, replica)
}
