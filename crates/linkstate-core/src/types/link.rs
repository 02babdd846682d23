//! Link descriptions, composed links and link events

use super::identifiers::{ConnectPoint, LinkKey, ProviderId};
use crate::errors::LinkStoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form key/value annotations attached to a link
pub type Annotations = BTreeMap<String, String>;

/// How a link was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkType {
    /// Direct physical adjacency
    Direct,
    /// Adjacency inferred through an intermediate network
    Indirect,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Direct => f.write_str("DIRECT"),
            LinkType::Indirect => f.write_str("INDIRECT"),
        }
    }
}

/// A link as reported by a single provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkDescription {
    src: ConnectPoint,
    dst: ConnectPoint,
    link_type: LinkType,
    #[serde(default)]
    annotations: Annotations,
}

impl LinkDescription {
    /// Create a description without annotations
    pub fn new(src: ConnectPoint, dst: ConnectPoint, link_type: LinkType) -> Self {
        Self {
            src,
            dst,
            link_type,
            annotations: Annotations::new(),
        }
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Replace all annotations
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Source endpoint
    pub fn src(&self) -> &ConnectPoint {
        &self.src
    }

    /// Destination endpoint
    pub fn dst(&self) -> &ConnectPoint {
        &self.dst
    }

    /// Discovery type
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Provider annotations
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Key of the link this description refers to
    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.src.clone(), self.dst.clone())
    }

    /// Reject self-loops
    pub fn validate(&self) -> Result<(), LinkStoreError> {
        if self.src == self.dst {
            return Err(LinkStoreError::invalid_description(format!(
                "source and destination are both {}",
                self.src
            )));
        }
        Ok(())
    }
}

/// The composed, externally visible link
///
/// Derived from every provider's description of the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    src: ConnectPoint,
    dst: ConnectPoint,
    link_type: LinkType,
    annotations: Annotations,
    provider_id: ProviderId,
}

impl Link {
    /// Create a composed link
    pub fn new(
        src: ConnectPoint,
        dst: ConnectPoint,
        link_type: LinkType,
        annotations: Annotations,
        provider_id: ProviderId,
    ) -> Self {
        Self {
            src,
            dst,
            link_type,
            annotations,
            provider_id,
        }
    }

    /// Source endpoint
    pub fn src(&self) -> &ConnectPoint {
        &self.src
    }

    /// Destination endpoint
    pub fn dst(&self) -> &ConnectPoint {
        &self.dst
    }

    /// Discovery type of the primary description
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Merged annotations of all providers
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Provider whose description supplied the base fields
    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    /// Key of this link
    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.src.clone(), self.dst.clone())
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} {} via {}",
            self.src, self.dst, self.link_type, self.provider_id
        )
    }
}

/// Kind of change a [`LinkEvent`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkEventKind {
    /// A link became visible
    Added,
    /// A visible link changed type or annotations
    Updated,
    /// A link was removed
    Removed,
}

/// Change notification for a composed link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEvent {
    kind: LinkEventKind,
    link: Link,
}

impl LinkEvent {
    /// Create an event
    pub fn new(kind: LinkEventKind, link: Link) -> Self {
        Self { kind, link }
    }

    /// Link became visible
    pub fn added(link: Link) -> Self {
        Self::new(LinkEventKind::Added, link)
    }

    /// Link changed
    pub fn updated(link: Link) -> Self {
        Self::new(LinkEventKind::Updated, link)
    }

    /// Link was removed
    pub fn removed(link: Link) -> Self {
        Self::new(LinkEventKind::Removed, link)
    }

    /// Kind of change
    pub fn kind(&self) -> LinkEventKind {
        self.kind
    }

    /// Link after the change (or the last value, for removals)
    pub fn link(&self) -> &Link {
        &self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_loop_is_rejected() {
        let cp = ConnectPoint::new("of:a", 1);
        let desc = LinkDescription::new(cp.clone(), cp, LinkType::Direct);

        assert!(matches!(
            desc.validate(),
            Err(LinkStoreError::InvalidDescription { .. })
        ));
    }

    #[test]
    fn description_key_uses_endpoints() {
        let desc = LinkDescription::new(
            ConnectPoint::new("of:a", 1),
            ConnectPoint::new("of:b", 2),
            LinkType::Indirect,
        )
        .with_annotation("bw", "10G");

        assert!(desc.validate().is_ok());
        assert_eq!(desc.key().src(), desc.src());
        assert_eq!(desc.annotations().get("bw").map(String::as_str), Some("10G"));
    }
}
