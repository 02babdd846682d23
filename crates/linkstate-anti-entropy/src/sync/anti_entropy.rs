use crate::config::AntiEntropyConfig;
use crate::effects::{ExchangeStats, ReplicaEffects, RoundStats, SyncError};
use crate::pure;
use crate::wire::{
    self, Advertisement, FragmentRequest, FragmentResponse, ADVERTISEMENT_SUBJECT, FETCH_SUBJECT,
};
use async_lock::Mutex;
use futures::future::join_all;
use linkstate_core::effects::{ClusterMessage, MessageHandler, MessageSubject, MessagingEffects};
use linkstate_core::NodeId;
use rand::Rng;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Handler driving the anti-entropy protocol from the initiating side
///
/// One exchange with a peer:
/// 1. send the local advertisement, receive the peer's in reply
/// 2. fetch every fragment the peer holds at a newer timestamp
/// 3. merge fetched updates, then the peer's newer tombstones
///
/// The peer repairs itself from our advertisement when it initiates its own
/// round; the responder only applies our tombstones.
pub struct AntiEntropyHandler {
    config: AntiEntropyConfig,
    replica: Arc<dyn ReplicaEffects>,
    messaging: Arc<dyn MessagingEffects>,
    /// Serializes rounds so a manual round never overlaps the periodic one
    round: Mutex<()>,
}

impl AntiEntropyHandler {
    pub fn new(
        config: AntiEntropyConfig,
        replica: Arc<dyn ReplicaEffects>,
        messaging: Arc<dyn MessagingEffects>,
    ) -> Self {
        Self {
            config,
            replica,
            messaging,
            round: Mutex::new(()),
        }
    }

    /// Get the anti-entropy configuration
    pub fn config(&self) -> &AntiEntropyConfig {
        &self.config
    }

    /// Run one exchange with `peer`, bounded by the exchange timeout
    pub async fn sync_with_peer(&self, peer: &NodeId) -> Result<ExchangeStats, SyncError> {
        let timeout = self.config.exchange_timeout();
        match tokio::time::timeout(timeout, self.exchange(peer)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                peer: peer.clone(),
                timeout_ms: self.config.exchange_timeout_ms,
            }),
        }
    }

    async fn exchange(&self, peer: &NodeId) -> Result<ExchangeStats, SyncError> {
        let mut stats = ExchangeStats::new(peer.clone());
        let local = self.replica.advertisement();

        let reply = self
            .messaging
            .request(
                peer,
                &MessageSubject::new(ADVERTISEMENT_SUBJECT),
                wire::encode(&local)?,
            )
            .await?;
        let remote: Advertisement = wire::decode(&reply)?;

        let wanted = pure::fragments_to_pull(&local, &remote);
        if !wanted.is_empty() {
            stats.fragments_requested = wanted.len();
            let request = FragmentRequest { fragments: wanted };
            let reply = self
                .messaging
                .request(
                    peer,
                    &MessageSubject::new(FETCH_SUBJECT),
                    wire::encode(&request)?,
                )
                .await?;
            let response: FragmentResponse = wire::decode(&reply)?;

            let mut updates = response.updates;
            // Newest first per link: it lifts a local tombstone before the
            // older fragments of the same link are merged.
            updates.sort_by_cached_key(|update| (update.key(), Reverse(update.timestamp())));

            for update in updates {
                if self.replica.apply_update(update).is_some() {
                    stats.updates_applied += 1;
                }
            }
        }

        // Tombstones are judged against the advertisement taken before the
        // fetch; the removal path re-checks against current state.
        for removal in pure::tombstones_to_apply(&local, &remote) {
            if self.replica.apply_removal(removal).is_some() {
                stats.tombstones_applied += 1;
            }
        }

        Ok(stats)
    }

    /// Exchange with every current peer concurrently
    pub async fn run_round(&self) -> RoundStats {
        let _round = self.round.lock().await;
        let peers = self.messaging.peers();

        let results = join_all(peers.iter().map(|peer| self.sync_with_peer(peer))).await;

        let mut stats = RoundStats::default();
        for result in results {
            match result {
                Ok(exchange) => {
                    tracing::debug!(
                        peer = %exchange.peer,
                        fragments = exchange.fragments_requested,
                        applied = exchange.updates_applied,
                        tombstones = exchange.tombstones_applied,
                        "Anti-entropy exchange complete"
                    );
                    stats.absorb(&exchange);
                }
                Err(e) => {
                    tracing::warn!(code = e.code(), error = %e, "Anti-entropy exchange failed");
                    stats.record_failure();
                }
            }
        }
        stats
    }

    fn next_delay(&self) -> Duration {
        let jitter_ms = if self.config.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        };
        self.config.interval() + Duration::from_millis(jitter_ms)
    }

    /// Periodic loop; returns once `shutdown` flips to `true` or its sender is
    /// dropped
    ///
    /// Shutdown is observed between rounds. A round in flight finishes first;
    /// its exchanges are already bounded by the exchange timeout.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !self.config.enabled {
            tracing::debug!("Anti-entropy disabled");
            return;
        }

        let mut delay = self.config.initial_delay();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let stats = self.run_round().await;
            if stats.updates_applied > 0 || stats.tombstones_applied > 0 || stats.peers_failed > 0 {
                tracing::info!(
                    peers = stats.peers_contacted,
                    failed = stats.peers_failed,
                    applied = stats.updates_applied,
                    tombstones = stats.tombstones_applied,
                    "Anti-entropy round repaired divergence"
                );
            }
            delay = self.next_delay();
        }
        tracing::debug!("Anti-entropy loop stopped");
    }
}

/// Serves anti-entropy requests from peers
///
/// Registered on the advertisement and fetch subjects. An incoming
/// advertisement also hands the initiator's newer tombstones to the local
/// removal path before the reply is built.
pub struct AntiEntropyResponder {
    replica: Arc<dyn ReplicaEffects>,
}

impl AntiEntropyResponder {
    pub fn new(replica: Arc<dyn ReplicaEffects>) -> Self {
        Self { replica }
    }

    fn on_advertisement(&self, payload: &[u8]) -> Result<Vec<u8>, SyncError> {
        let remote: Advertisement = wire::decode(payload)?;
        let local = self.replica.advertisement();

        let removals = pure::tombstones_to_apply(&local, &remote);
        if removals.is_empty() {
            return wire::encode(&local);
        }
        for removal in removals {
            self.replica.apply_removal(removal);
        }
        wire::encode(&self.replica.advertisement())
    }

    fn on_fetch(&self, payload: &[u8]) -> Result<Vec<u8>, SyncError> {
        let request: FragmentRequest = wire::decode(payload)?;
        let response = FragmentResponse {
            updates: self.replica.fragments(&request.fragments),
        };
        wire::encode(&response)
    }
}

impl MessageHandler for AntiEntropyResponder {
    fn handle(&self, message: ClusterMessage) -> Option<Vec<u8>> {
        let result = match message.subject.as_str() {
            ADVERTISEMENT_SUBJECT => self.on_advertisement(&message.payload),
            FETCH_SUBJECT => self.on_fetch(&message.payload),
            other => {
                tracing::debug!(subject = other, "Anti-entropy responder ignoring subject");
                return None;
            }
        };

        match result {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(
                    peer = %message.sender,
                    subject = %message.subject,
                    error = %e,
                    "Rejecting anti-entropy request"
                );
                None
            }
        }
    }
}
