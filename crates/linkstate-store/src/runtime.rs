//! Replica lifecycle
//!
//! [`LinkStore::start`] wires a [`GossipLinkStore`] into the cluster:
//! subscribes the gossip receiver and anti-entropy responder, and spawns the
//! gossip drain, anti-entropy and tombstone purge tasks. [`LinkStore::stop`]
//! undoes all of it. Both must run inside a Tokio runtime.

use crate::config::LinkStoreConfig;
use crate::store::GossipLinkStore;
use linkstate_anti_entropy::wire::{anti_entropy_subjects, gossip_subjects};
use linkstate_anti_entropy::{
    AntiEntropyHandler, AntiEntropyResponder, GossipBroadcaster, GossipReceiver, ReplicaEffects,
    RoundStats,
};
use linkstate_core::config::LinkStateConfig;
use linkstate_core::effects::{
    ClockEffects, LinkStoreDelegate, MessageHandler, MessageSubject, MessagingEffects,
};
use linkstate_core::LinkStoreResult;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A running link store replica
///
/// Dereferences to [`GossipLinkStore`] for mutations and queries.
pub struct LinkStore {
    store: Arc<GossipLinkStore>,
    messaging: Arc<dyn MessagingEffects>,
    gossip: GossipBroadcaster,
    anti_entropy: Arc<AntiEntropyHandler>,
    subjects: Vec<MessageSubject>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl LinkStore {
    /// Validate `config` and bring a replica online
    pub fn start(
        config: LinkStoreConfig,
        clock: Arc<dyn ClockEffects>,
        messaging: Arc<dyn MessagingEffects>,
        delegate: Arc<dyn LinkStoreDelegate>,
    ) -> LinkStoreResult<Self> {
        config.validate()?;
        let node = messaging.local_node();

        let gossip = GossipBroadcaster::spawn(config.gossip.clone(), Arc::clone(&messaging));
        let store = Arc::new(GossipLinkStore::new(
            node.clone(),
            clock,
            delegate,
            gossip.clone(),
            config.tombstones.retention(),
        ));
        let replica: Arc<dyn ReplicaEffects> = store.clone();

        let receiver: Arc<dyn MessageHandler> = Arc::new(GossipReceiver::new(Arc::clone(&replica)));
        let responder: Arc<dyn MessageHandler> =
            Arc::new(AntiEntropyResponder::new(Arc::clone(&replica)));
        let mut subjects = Vec::new();
        let registrations = gossip_subjects()
            .into_iter()
            .map(|subject| (subject, Arc::clone(&receiver)))
            .chain(
                anti_entropy_subjects()
                    .into_iter()
                    .map(|subject| (subject, Arc::clone(&responder))),
            );
        for (subject, handler) in registrations {
            if let Err(e) = messaging.subscribe(subject.clone(), handler) {
                for registered in &subjects {
                    messaging.unsubscribe(registered);
                }
                return Err(e.into());
            }
            subjects.push(subject);
        }

        let anti_entropy = Arc::new(AntiEntropyHandler::new(
            config.anti_entropy.clone(),
            replica,
            Arc::clone(&messaging),
        ));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(Arc::clone(&anti_entropy).run(shutdown_rx.clone())),
            tokio::spawn(purge_loop(
                Arc::clone(&store),
                config.tombstones.purge_interval(),
                shutdown_rx,
            )),
        ];

        tracing::info!(node = %node, "Link store started");
        Ok(Self {
            store,
            messaging,
            gossip,
            anti_entropy,
            subjects,
            shutdown,
            tasks,
        })
    }

    /// Shared handle to the replica
    pub fn store(&self) -> &Arc<GossipLinkStore> {
        &self.store
    }

    /// Run one anti-entropy round against every peer now
    pub async fn run_anti_entropy_round(&self) -> RoundStats {
        self.anti_entropy.run_round().await
    }

    /// Wait until gossip queued so far has been handed to the messaging layer
    pub async fn flush_gossip(&self) {
        self.gossip.flush().await;
    }

    /// Take the replica offline
    ///
    /// Local mutations fail with `NotRunning` afterwards. Queued gossip is
    /// still sent; background tasks stop at their next round boundary.
    pub async fn stop(self) {
        let node = self.store.node().clone();
        self.store.mark_stopped();
        for subject in &self.subjects {
            self.messaging.unsubscribe(subject);
        }
        let _ = self.shutdown.send(true);

        self.gossip.shutdown().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(node = %node, error = %e, "Link store task failed");
            }
        }
        tracing::info!(node = %node, "Link store stopped");
    }
}

impl Deref for LinkStore {
    type Target = GossipLinkStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

async fn purge_loop(
    store: Arc<GossipLinkStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(period) => {
                store.purge_tombstones();
            }
        }
    }
}
