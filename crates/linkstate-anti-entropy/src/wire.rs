//! Gossip and anti-entropy wire format.
//!
//! Payloads travel as DAG-CBOR `VersionedMessage`s. Subjects distinguish the
//! message kinds; the payload types below carry no discriminator of their own.
//! Collections are sequences of entries so every map key on the wire is a
//! string.

use crate::effects::SyncError;
use linkstate_core::effects::MessageSubject;
use linkstate_core::serialization::{self, SemanticVersion, SerializationError};
use linkstate_core::{
    LinkDescription, LinkFragmentId, LinkKey, NodeId, ProviderId, Timestamp, Timestamped,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Protocol version stamped on every outbound payload
pub const WIRE_VERSION: SemanticVersion = SemanticVersion::new(1, 0, 0);

pub const LINK_UPDATE_SUBJECT: &str = "peer-link-update";
pub const LINK_REMOVED_SUBJECT: &str = "peer-link-removed";
pub const ADVERTISEMENT_SUBJECT: &str = "link-anti-entropy-advertisement";
pub const FETCH_SUBJECT: &str = "link-anti-entropy-fetch";

/// Subjects carrying gossip (`LinkUpdate`, `LinkRemoved`)
pub fn gossip_subjects() -> [MessageSubject; 2] {
    [
        MessageSubject::new(LINK_UPDATE_SUBJECT),
        MessageSubject::new(LINK_REMOVED_SUBJECT),
    ]
}

/// Subjects carrying anti-entropy requests (advertisement, fetch)
pub fn anti_entropy_subjects() -> [MessageSubject; 2] {
    [
        MessageSubject::new(ADVERTISEMENT_SUBJECT),
        MessageSubject::new(FETCH_SUBJECT),
    ]
}

/// One provider's timestamped description of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub provider_id: ProviderId,
    pub description: Timestamped<LinkDescription>,
}

impl LinkUpdate {
    pub fn new(provider_id: ProviderId, description: Timestamped<LinkDescription>) -> Self {
        Self {
            provider_id,
            description,
        }
    }

    pub fn key(&self) -> LinkKey {
        self.description.value().key()
    }

    pub fn fragment_id(&self) -> LinkFragmentId {
        LinkFragmentId::new(self.key(), self.provider_id.clone())
    }

    pub fn timestamp(&self) -> Timestamp {
        self.description.timestamp()
    }
}

/// Removal of a link at a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRemoved {
    pub key: LinkKey,
    pub timestamp: Timestamp,
}

impl LinkRemoved {
    pub fn new(key: LinkKey, timestamp: Timestamp) -> Self {
        Self { key, timestamp }
    }
}

/// Newest timestamp a replica holds for one fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentTimestamp {
    pub fragment: LinkFragmentId,
    pub timestamp: Timestamp,
}

/// Removal timestamp a replica holds for one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TombstoneTimestamp {
    pub key: LinkKey,
    pub timestamp: Timestamp,
}

/// Summary of everything a replica holds, without the descriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    pub sender: NodeId,
    #[serde(default)]
    pub fragments: Vec<FragmentTimestamp>,
    #[serde(default)]
    pub tombstones: Vec<TombstoneTimestamp>,
}

impl Advertisement {
    pub fn new(sender: NodeId) -> Self {
        Self {
            sender,
            fragments: Vec::new(),
            tombstones: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.tombstones.is_empty()
    }
}

/// Request for full descriptions of the listed fragments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRequest {
    pub fragments: Vec<LinkFragmentId>,
}

/// Descriptions the responder still holds for a [`FragmentRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentResponse {
    #[serde(default)]
    pub updates: Vec<LinkUpdate>,
}

/// Encode a payload at [`WIRE_VERSION`]
pub fn encode<T: Serialize>(payload: &T) -> Result<Vec<u8>, SyncError> {
    serialization::encode_versioned(payload, WIRE_VERSION).map_err(SyncError::from)
}

/// Decode a payload, rejecting incompatible protocol versions
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SyncError> {
    serialization::decode_versioned(bytes, WIRE_VERSION).map_err(SyncError::from)
}

impl From<SerializationError> for SyncError {
    fn from(err: SerializationError) -> Self {
        match err {
            SerializationError::IncompatibleVersion { received, local } => {
                SyncError::IncompatibleVersion {
                    received: received.to_string(),
                    local: local.to_string(),
                }
            }
            other => SyncError::Wire(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstate_core::serialization::{to_vec, VersionedMessage};
    use linkstate_core::{ConnectPoint, LinkType};

    fn key() -> LinkKey {
        LinkKey::new(ConnectPoint::new("of:a", 1), ConnectPoint::new("of:b", 2))
    }

    fn update() -> LinkUpdate {
        let description = LinkDescription::new(
            ConnectPoint::new("of:a", 1),
            ConnectPoint::new("of:b", 2),
            LinkType::Direct,
        )
        .with_annotation("bw", "10G");
        LinkUpdate::new(
            ProviderId::new("lldp", "core"),
            Timestamped::new(description, Timestamp::new(1, 42)),
        )
    }

    #[test]
    fn link_update_survives_the_wire() {
        let bytes = encode(&update()).unwrap();
        let decoded: LinkUpdate = decode(&bytes).unwrap();

        assert_eq!(decoded, update());
        assert_eq!(decoded.fragment_id().key(), &key());
    }

    #[test]
    fn advertisement_survives_the_wire() {
        let mut advertisement = Advertisement::new(NodeId::new("node-1"));
        advertisement.fragments.push(FragmentTimestamp {
            fragment: update().fragment_id(),
            timestamp: Timestamp::new(1, 42),
        });
        advertisement.tombstones.push(TombstoneTimestamp {
            key: key(),
            timestamp: Timestamp::new(1, 43),
        });

        let decoded: Advertisement = decode(&encode(&advertisement).unwrap()).unwrap();
        assert_eq!(decoded, advertisement);
    }

    #[test]
    fn next_major_version_is_rejected() {
        let removal = LinkRemoved::new(key(), Timestamp::new(1, 1));
        let bytes = to_vec(&VersionedMessage::new(removal, SemanticVersion::new(2, 0, 0))).unwrap();

        let result: Result<LinkRemoved, _> = decode(&bytes);
        assert!(matches!(result, Err(SyncError::IncompatibleVersion { .. })));
    }

    #[test]
    fn truncated_payload_is_a_wire_error() {
        let bytes = encode(&update()).unwrap();
        let result: Result<LinkUpdate, _> = decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(SyncError::Wire(_))));
    }

    #[test]
    fn subjects_are_distinct() {
        let mut all: Vec<_> = gossip_subjects()
            .into_iter()
            .chain(anti_entropy_subjects())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
    }
}
