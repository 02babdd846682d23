//! Inbound gossip handler.

use crate::effects::ReplicaEffects;
use crate::wire::{self, LinkRemoved, LinkUpdate, LINK_REMOVED_SUBJECT, LINK_UPDATE_SUBJECT};
use linkstate_core::effects::{ClusterMessage, MessageHandler};
use std::sync::Arc;

/// Applies peer gossip to the local replica
///
/// Registered on both gossip subjects. A payload that fails to decode is
/// logged and dropped; it never affects later messages. Applied mutations are
/// not forwarded, so dissemination is single-hop.
pub struct GossipReceiver {
    replica: Arc<dyn ReplicaEffects>,
}

impl GossipReceiver {
    pub fn new(replica: Arc<dyn ReplicaEffects>) -> Self {
        Self { replica }
    }
}

impl MessageHandler for GossipReceiver {
    fn handle(&self, message: ClusterMessage) -> Option<Vec<u8>> {
        match message.subject.as_str() {
            LINK_UPDATE_SUBJECT => match wire::decode::<LinkUpdate>(&message.payload) {
                Ok(update) => {
                    tracing::trace!(
                        peer = %message.sender,
                        link = %update.key(),
                        provider = %update.provider_id,
                        "Received link update"
                    );
                    self.replica.apply_update(update);
                }
                Err(e) => {
                    tracing::warn!(peer = %message.sender, error = %e, "Dropping undecodable link update");
                }
            },
            LINK_REMOVED_SUBJECT => match wire::decode::<LinkRemoved>(&message.payload) {
                Ok(removal) => {
                    tracing::trace!(peer = %message.sender, link = %removal.key, "Received link removal");
                    self.replica.apply_removal(removal);
                }
                Err(e) => {
                    tracing::warn!(peer = %message.sender, error = %e, "Dropping undecodable link removal");
                }
            },
            other => {
                tracing::debug!(subject = other, "Gossip receiver ignoring subject");
            }
        }
        None
    }
}
