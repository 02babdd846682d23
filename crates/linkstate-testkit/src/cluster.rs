//! In-memory cluster messaging
//!
//! Every node joined to a [`MemoryCluster`] gets a [`MemoryMessaging`] handle
//! implementing [`MessagingEffects`]. Handlers run inline on the sender's task,
//! always outside the cluster lock, so a handler may itself send messages.
//!
//! Fault injection:
//! - [`GossipMode`]: deliver broadcasts, hold them for later, or drop them
//! - partitions between node pairs (broadcasts skip, requests fail)
//! - unresponsive nodes (requests to them never complete)

use async_trait::async_trait;
use linkstate_core::effects::{
    ClusterMessage, MessageHandler, MessageSubject, MessagingEffects, MessagingError,
};
use linkstate_core::NodeId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// What happens to broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GossipMode {
    /// Deliver immediately
    #[default]
    Deliver,
    /// Queue until [`MemoryCluster::deliver_held`]
    Hold,
    /// Discard, simulating loss
    Drop,
}

struct Delivery {
    to: NodeId,
    message: ClusterMessage,
}

#[derive(Default)]
struct ClusterState {
    handlers: BTreeMap<NodeId, HashMap<MessageSubject, Arc<dyn MessageHandler>>>,
    partitions: BTreeSet<(NodeId, NodeId)>,
    unresponsive: BTreeSet<NodeId>,
    mode: GossipMode,
    held: Vec<Delivery>,
    broadcasts_sent: usize,
}

impl ClusterState {
    fn partitioned(&self, a: &NodeId, b: &NodeId) -> bool {
        self.partitions.contains(&ordered(a, b))
    }

    fn handler(&self, node: &NodeId, subject: &MessageSubject) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.get(node)?.get(subject).cloned()
    }
}

fn ordered(a: &NodeId, b: &NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Shared in-memory network
#[derive(Clone, Default)]
pub struct MemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl MemoryCluster {
    /// Create an empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its messaging handle
    pub fn join(&self, node: impl Into<NodeId>) -> Arc<MemoryMessaging> {
        let node = node.into();
        self.state.lock().handlers.entry(node.clone()).or_default();
        Arc::new(MemoryMessaging {
            node,
            cluster: self.clone(),
        })
    }

    /// Remove a node; it stops receiving and stops being listed as a peer
    pub fn leave(&self, node: &str) {
        self.state.lock().handlers.remove(&NodeId::new(node));
    }

    /// Cut the link between two nodes in both directions
    pub fn partition(&self, a: &str, b: &str) {
        let key = ordered(&NodeId::new(a), &NodeId::new(b));
        self.state.lock().partitions.insert(key);
    }

    /// Restore the link between two nodes
    pub fn heal(&self, a: &str, b: &str) {
        let key = ordered(&NodeId::new(a), &NodeId::new(b));
        self.state.lock().partitions.remove(&key);
    }

    /// Restore every link
    pub fn heal_all(&self) {
        self.state.lock().partitions.clear();
    }

    /// Make requests to `node` hang forever (or stop doing so)
    pub fn set_unresponsive(&self, node: &str, unresponsive: bool) {
        let node = NodeId::new(node);
        let mut state = self.state.lock();
        if unresponsive {
            state.unresponsive.insert(node);
        } else {
            state.unresponsive.remove(&node);
        }
    }

    /// Choose what happens to subsequent broadcasts
    pub fn set_gossip_mode(&self, mode: GossipMode) {
        self.state.lock().mode = mode;
    }

    /// Number of broadcasts waiting under [`GossipMode::Hold`]
    pub fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }

    /// Deliver held broadcasts, most recent first, skipping partitioned
    /// receivers; returns how many were delivered
    ///
    /// Reverse order exercises the replica's tolerance to reordering.
    pub fn deliver_held_reversed(&self) -> usize {
        let mut held = std::mem::take(&mut self.state.lock().held);
        held.reverse();
        self.deliver(held)
    }

    /// Deliver held broadcasts in send order; returns how many were delivered
    pub fn deliver_held(&self) -> usize {
        let held = std::mem::take(&mut self.state.lock().held);
        self.deliver(held)
    }

    /// Discard held broadcasts; returns how many were dropped
    pub fn drop_held(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.held.len();
        state.held.clear();
        dropped
    }

    /// Broadcasts accepted by the cluster so far
    pub fn broadcasts_sent(&self) -> usize {
        self.state.lock().broadcasts_sent
    }

    fn deliver(&self, deliveries: Vec<Delivery>) -> usize {
        let resolved: Vec<_> = {
            let state = self.state.lock();
            deliveries
                .into_iter()
                .filter(|d| !state.partitioned(&d.message.sender, &d.to))
                .filter_map(|d| {
                    state
                        .handler(&d.to, &d.message.subject)
                        .map(|handler| (handler, d.message))
                })
                .collect()
        };

        let delivered = resolved.len();
        for (handler, message) in resolved {
            handler.handle(message);
        }
        delivered
    }
}

/// One node's view of a [`MemoryCluster`]
pub struct MemoryMessaging {
    node: NodeId,
    cluster: MemoryCluster,
}

impl MemoryMessaging {
    /// The cluster this node belongs to
    pub fn cluster(&self) -> &MemoryCluster {
        &self.cluster
    }
}

#[async_trait]
impl MessagingEffects for MemoryMessaging {
    fn local_node(&self) -> NodeId {
        self.node.clone()
    }

    fn peers(&self) -> Vec<NodeId> {
        self.cluster
            .state
            .lock()
            .handlers
            .keys()
            .filter(|node| **node != self.node)
            .cloned()
            .collect()
    }

    async fn broadcast(
        &self,
        subject: &MessageSubject,
        payload: Vec<u8>,
    ) -> Result<(), MessagingError> {
        let deliveries: Vec<Delivery> = {
            let mut state = self.cluster.state.lock();
            state.broadcasts_sent += 1;
            let targets: Vec<NodeId> = state
                .handlers
                .keys()
                .filter(|node| **node != self.node)
                .cloned()
                .collect();
            let deliveries = targets
                .into_iter()
                .map(|to| Delivery {
                    to,
                    message: ClusterMessage {
                        sender: self.node.clone(),
                        subject: subject.clone(),
                        payload: payload.clone(),
                    },
                })
                .collect();

            match state.mode {
                GossipMode::Deliver => deliveries,
                GossipMode::Hold => {
                    state.held.extend(deliveries);
                    Vec::new()
                }
                GossipMode::Drop => Vec::new(),
            }
        };

        self.cluster.deliver(deliveries);
        Ok(())
    }

    async fn request(
        &self,
        peer: &NodeId,
        subject: &MessageSubject,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, MessagingError> {
        let handler = {
            let state = self.cluster.state.lock();
            if !state.handlers.contains_key(peer) || state.partitioned(&self.node, peer) {
                return Err(MessagingError::PeerUnreachable { peer: peer.clone() });
            }
            if state.unresponsive.contains(peer) {
                None
            } else {
                Some(state.handler(peer, subject))
            }
        };

        let Some(handler) = handler else {
            return futures::future::pending().await;
        };
        let no_reply = || MessagingError::NoReply {
            peer: peer.clone(),
            subject: subject.to_string(),
        };

        let handler = handler.ok_or_else(no_reply)?;
        handler
            .handle(ClusterMessage {
                sender: self.node.clone(),
                subject: subject.clone(),
                payload,
            })
            .ok_or_else(no_reply)
    }

    fn subscribe(
        &self,
        subject: MessageSubject,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), MessagingError> {
        let mut state = self.cluster.state.lock();
        let handlers = state.handlers.entry(self.node.clone()).or_default();
        if handlers.contains_key(&subject) {
            return Err(MessagingError::AlreadySubscribed {
                subject: subject.to_string(),
            });
        }
        handlers.insert(subject, handler);
        Ok(())
    }

    fn unsubscribe(&self, subject: &MessageSubject) {
        if let Some(handlers) = self.cluster.state.lock().handlers.get_mut(&self.node) {
            handlers.remove(subject);
        }
    }
}
