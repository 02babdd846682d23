//! Cluster messaging effects
//!
//! The link store needs three things from the cluster layer: best-effort
//! broadcast for gossip, a request/response exchange for anti-entropy, and
//! subject-keyed subscriptions for inbound traffic. Delivery guarantees are
//! deliberately weak: broadcasts are unacknowledged and single-hop.

use crate::types::NodeId;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Topic distinguishing message kinds on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageSubject(String);

impl MessageSubject {
    /// Create a subject
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    /// Get the subject string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageSubject {
    fn from(subject: &str) -> Self {
        Self::new(subject)
    }
}

/// Inbound message delivered to a [`MessageHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMessage {
    /// Node that sent the message
    pub sender: NodeId,
    /// Subject the message was sent on
    pub subject: MessageSubject,
    /// Opaque encoded payload
    pub payload: Vec<u8>,
}

/// Cluster messaging errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    /// Broadcast could not be handed to the transport
    #[error("Broadcast failed: {reason}")]
    BroadcastFailed {
        /// Reason for broadcast failure
        reason: String,
    },
    /// Peer could not be reached
    #[error("Peer unreachable: {peer}")]
    PeerUnreachable {
        /// Identifier of the unreachable peer
        peer: NodeId,
    },
    /// Peer has no handler for the subject or produced no reply
    #[error("No reply from {peer} on {subject}")]
    NoReply {
        /// Peer the request targeted
        peer: NodeId,
        /// Subject of the request
        subject: String,
    },
    /// A handler is already registered for the subject
    #[error("Subject already subscribed: {subject}")]
    AlreadySubscribed {
        /// The duplicated subject
        subject: String,
    },
}

/// Handler for inbound messages on one subject
///
/// Handlers run on the messaging layer's delivery context and must not block.
/// The returned bytes, if any, are the reply to a request; broadcast
/// deliveries ignore them.
pub trait MessageHandler: Send + Sync {
    /// Process one message
    fn handle(&self, message: ClusterMessage) -> Option<Vec<u8>>;
}

/// Cluster communication used by the link store
#[async_trait]
pub trait MessagingEffects: Send + Sync {
    /// Identity of this node
    fn local_node(&self) -> NodeId;

    /// Current cluster members other than this node
    fn peers(&self) -> Vec<NodeId>;

    /// Send `payload` to every peer without waiting for acknowledgment
    async fn broadcast(
        &self,
        subject: &MessageSubject,
        payload: Vec<u8>,
    ) -> Result<(), MessagingError>;

    /// Send `payload` to `peer` and wait for its handler's reply
    ///
    /// Implementations may wait indefinitely; callers bound the exchange.
    async fn request(
        &self,
        peer: &NodeId,
        subject: &MessageSubject,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, MessagingError>;

    /// Register the handler for a subject
    fn subscribe(
        &self,
        subject: MessageSubject,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), MessagingError>;

    /// Remove the handler for a subject, if any
    fn unsubscribe(&self, subject: &MessageSubject);
}

/// Blanket implementation for Arc<T> where T: MessagingEffects
#[async_trait]
impl<T: MessagingEffects + ?Sized> MessagingEffects for Arc<T> {
    fn local_node(&self) -> NodeId {
        (**self).local_node()
    }

    fn peers(&self) -> Vec<NodeId> {
        (**self).peers()
    }

    async fn broadcast(
        &self,
        subject: &MessageSubject,
        payload: Vec<u8>,
    ) -> Result<(), MessagingError> {
        (**self).broadcast(subject, payload).await
    }

    async fn request(
        &self,
        peer: &NodeId,
        subject: &MessageSubject,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, MessagingError> {
        (**self).request(peer, subject, payload).await
    }

    fn subscribe(
        &self,
        subject: MessageSubject,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), MessagingError> {
        (**self).subscribe(subject, handler)
    }

    fn unsubscribe(&self, subject: &MessageSubject) {
        (**self).unsubscribe(subject);
    }
}
