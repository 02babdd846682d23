//! DAG-CBOR serialization for inter-node payloads
//!
//! Every payload exchanged between replicas is wrapped in a
//! [`VersionedMessage`] and encoded as DAG-CBOR:
//! - self-describing, so unknown fields added by newer members are skipped
//! - versioned, so an incompatible major version is rejected up front
//! - compact binary encoding

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unified error type for serialization operations
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// DAG-CBOR encoding/decoding error
    #[error("DAG-CBOR error: {0}")]
    DagCbor(String),

    /// Invalid data format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Payload was produced by an incompatible protocol version
    #[error("Incompatible version {received} (local {local})")]
    IncompatibleVersion {
        /// Version carried by the payload
        received: SemanticVersion,
        /// Version spoken by this node
        local: SemanticVersion,
    },
}

/// Standard Result type for serialization operations
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serialize any serde-compatible type to DAG-CBOR bytes
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value).map_err(|e| {
        SerializationError::InvalidFormat(format!("Failed to serialize to DAG-CBOR: {}", e))
    })
}

/// Deserialize DAG-CBOR bytes to any serde-compatible type
pub fn from_slice<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(bytes).map_err(|e| SerializationError::DagCbor(e.to_string()))
}

/// Version information for semantic versioning support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticVersion {
    /// Major version number - increment for incompatible changes
    pub major: u16,
    /// Minor version number - increment for backwards-compatible additions
    pub minor: u16,
    /// Patch version number - increment for backwards-compatible bug fixes
    pub patch: u16,
}

impl SemanticVersion {
    /// Create a new semantic version
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Check if this version is compatible with another
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }

    /// Check if this version is newer than another
    pub fn is_newer(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch) > (other.major, other.minor, other.patch)
    }
}

impl std::fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Versioned message envelope for forward/backward compatibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedMessage<T> {
    /// Protocol version
    pub version: SemanticVersion,
    /// Message payload
    pub payload: T,
    /// Optional metadata for debugging
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl<T> VersionedMessage<T> {
    /// Create a new versioned message
    pub fn new(payload: T, version: SemanticVersion) -> Self {
        Self {
            version,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the message
    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }
}

/// Wrap `payload` at `version` and encode it
pub fn encode_versioned<T: Serialize>(payload: &T, version: SemanticVersion) -> Result<Vec<u8>> {
    to_vec(&VersionedMessage::new(payload, version))
}

/// Decode a versioned payload, rejecting incompatible major versions
pub fn decode_versioned<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
    local: SemanticVersion,
) -> Result<T> {
    let message: VersionedMessage<T> = from_slice(bytes)?;
    if !message.version.is_compatible(&local) {
        return Err(SerializationError::IncompatibleVersion {
            received: message.version,
            local,
        });
    }
    Ok(message.payload)
}
