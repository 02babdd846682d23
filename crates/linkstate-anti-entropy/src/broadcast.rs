//! Fire-and-forget gossip broadcaster.
//!
//! Publishing never blocks the caller: payloads are encoded and pushed onto a
//! bounded queue that a background task drains into the messaging layer.
//! When the queue is full the message is dropped; anti-entropy repairs the
//! resulting divergence on its next round.

use crate::wire::{self, LinkRemoved, LinkUpdate, LINK_REMOVED_SUBJECT, LINK_UPDATE_SUBJECT};
use linkstate_core::effects::{MessageSubject, MessagingEffects};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Configuration for broadcast behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Maximum encoded messages waiting for the drain task
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

enum Outbound {
    Gossip {
        subject: MessageSubject,
        payload: Vec<u8>,
    },
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Handle for publishing gossip to every peer
///
/// Cloning yields another handle onto the same queue and drain task.
#[derive(Clone)]
pub struct GossipBroadcaster {
    tx: mpsc::Sender<Outbound>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl GossipBroadcaster {
    /// Start the drain task on the current Tokio runtime
    pub fn spawn(config: BroadcastConfig, messaging: Arc<dyn MessagingEffects>) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let task = tokio::spawn(drain(rx, messaging));

        Self {
            tx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Queue a `LinkUpdate` for broadcast
    pub fn publish_update(&self, update: &LinkUpdate) {
        self.publish(LINK_UPDATE_SUBJECT, wire::encode(update));
    }

    /// Queue a `LinkRemoved` for broadcast
    pub fn publish_removal(&self, removal: &LinkRemoved) {
        self.publish(LINK_REMOVED_SUBJECT, wire::encode(removal));
    }

    fn publish(&self, subject: &str, payload: Result<Vec<u8>, crate::SyncError>) {
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(subject, error = %e, "Failed to encode gossip");
                return;
            }
        };

        let outbound = Outbound::Gossip {
            subject: MessageSubject::new(subject),
            payload,
        };
        match self.tx.try_send(outbound) {
            Ok(()) => tracing::trace!(subject, "Gossip queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(subject, "Gossip queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(subject, "Broadcaster stopped, dropping message");
            }
        }
    }

    /// Wait until every message queued before this call has been handed to
    /// the messaging layer
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Outbound::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    /// Drain what is queued, then stop the background task
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Outbound::Shutdown).await;
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Gossip drain task failed");
            }
        }
    }
}

async fn drain(mut rx: mpsc::Receiver<Outbound>, messaging: Arc<dyn MessagingEffects>) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Gossip { subject, payload } => {
                if let Err(e) = messaging.broadcast(&subject, payload).await {
                    tracing::warn!(subject = %subject, error = %e, "Gossip broadcast failed");
                } else {
                    tracing::debug!(subject = %subject, "Gossip published");
                }
            }
            Outbound::Flush(done) => {
                let _ = done.send(());
            }
            Outbound::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstate_core::effects::{ClusterMessage, MessageHandler};
    use linkstate_core::{Timestamp, Timestamped};
    use linkstate_testkit::fixtures::{cp, direct, primary_provider};
    use linkstate_testkit::MemoryCluster;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ClusterMessage>>);

    impl MessageHandler for Collect {
        fn handle(&self, message: ClusterMessage) -> Option<Vec<u8>> {
            self.0.lock().push(message);
            None
        }
    }

    fn update(seq: u64) -> LinkUpdate {
        LinkUpdate::new(
            primary_provider(),
            Timestamped::new(direct(cp("of:a", 1), cp("of:b", 1)), Timestamp::new(1, seq)),
        )
    }

    #[tokio::test]
    async fn published_gossip_reaches_peers_after_flush() {
        let cluster = MemoryCluster::new();
        let a = cluster.join("a");
        let b = cluster.join("b");
        let seen = Arc::new(Collect::default());
        b.subscribe(MessageSubject::new(LINK_UPDATE_SUBJECT), seen.clone())
            .unwrap();

        let broadcaster = GossipBroadcaster::spawn(BroadcastConfig::default(), a);
        broadcaster.publish_update(&update(1));
        broadcaster.publish_update(&update(2));
        broadcaster.flush().await;

        let seen = seen.0.lock();
        assert_eq!(seen.len(), 2);
        let decoded: LinkUpdate = wire::decode(&seen[1].payload).unwrap();
        assert_eq!(decoded, update(2));
    }

    #[tokio::test]
    async fn publishing_after_shutdown_is_dropped() {
        let cluster = MemoryCluster::new();
        let a = cluster.join("a");
        let _b = cluster.join("b");

        let broadcaster = GossipBroadcaster::spawn(BroadcastConfig::default(), a);
        broadcaster.shutdown().await;
        broadcaster.publish_update(&update(1));
        broadcaster.flush().await;

        assert_eq!(cluster.broadcasts_sent(), 0);
    }
}
