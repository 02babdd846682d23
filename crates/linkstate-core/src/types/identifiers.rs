//! Identifier types for link endpoints, links, providers and cluster nodes
//!
//! All identifiers are immutable value types. Their only behavior is equality,
//! hashing and a total order, which the store relies on to visit providers in
//! the same sequence on every replica.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Infrastructure device identifier
///
/// Opaque string such as `of:0000000000000001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Port number on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortNumber(pub u64);

impl PortNumber {
    /// Get the raw port number
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PortNumber {
    fn from(port: u64) -> Self {
        Self(port)
    }
}

/// One endpoint of a link: a port on a device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectPoint {
    device_id: DeviceId,
    port: PortNumber,
}

impl ConnectPoint {
    /// Create a connect point
    pub fn new(device_id: impl Into<DeviceId>, port: impl Into<PortNumber>) -> Self {
        Self {
            device_id: device_id.into(),
            port: port.into(),
        }
    }

    /// Device owning this endpoint
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Port on the device
    pub fn port(&self) -> PortNumber {
        self.port
    }
}

impl fmt::Display for ConnectPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.port)
    }
}

/// Unique identifier of a directed link
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    src: ConnectPoint,
    dst: ConnectPoint,
}

impl LinkKey {
    /// Create a link key from its endpoints
    pub fn new(src: ConnectPoint, dst: ConnectPoint) -> Self {
        Self { src, dst }
    }

    /// Source endpoint
    pub fn src(&self) -> &ConnectPoint {
        &self.src
    }

    /// Destination endpoint
    pub fn dst(&self) -> &ConnectPoint {
        &self.dst
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// Identity of a subsystem reporting link facts
///
/// Ancillary providers are lower-trust sources. They only determine the
/// composed link when no primary provider has reported it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId {
    scheme: String,
    id: String,
    ancillary: bool,
}

impl ProviderId {
    /// Create a primary (non-ancillary) provider identifier
    pub fn new(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
            ancillary: false,
        }
    }

    /// Create an ancillary provider identifier
    pub fn ancillary(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
            ancillary: true,
        }
    }

    /// URI scheme of the provider (e.g. `lldp`)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Provider identifier within its scheme
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this provider is a lower-trust source
    pub fn is_ancillary(&self) -> bool {
        self.ancillary
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.id)?;
        if self.ancillary {
            f.write_str(" (ancillary)")?;
        }
        Ok(())
    }
}

/// One provider's contribution to one link
///
/// The unit that anti-entropy advertises and fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkFragmentId {
    key: LinkKey,
    provider_id: ProviderId,
}

impl LinkFragmentId {
    /// Create a fragment identifier
    pub fn new(key: LinkKey, provider_id: ProviderId) -> Self {
        Self { key, provider_id }
    }

    /// Link the fragment belongs to
    pub fn key(&self) -> &LinkKey {
        &self.key
    }

    /// Provider that reported the fragment
    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }
}

impl fmt::Display for LinkFragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.key, self.provider_id)
    }
}

/// Cluster member identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
