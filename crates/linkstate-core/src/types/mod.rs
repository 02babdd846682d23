//! Identity and link model types

pub mod identifiers;
pub mod link;

pub use identifiers::{
    ConnectPoint, DeviceId, LinkFragmentId, LinkKey, NodeId, PortNumber, ProviderId,
};
pub use link::{Annotations, Link, LinkDescription, LinkEvent, LinkEventKind, LinkType};
