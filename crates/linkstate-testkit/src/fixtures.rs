//! Common link fixtures

use linkstate_core::{
    ConnectPoint, LinkDescription, LinkKey, LinkType, ProviderId, Timestamp, Timestamped,
};

/// Connect point on `device` at `port`
pub fn cp(device: &str, port: u64) -> ConnectPoint {
    ConnectPoint::new(device, port)
}

/// Key of the link `src -> dst`
pub fn key(src: ConnectPoint, dst: ConnectPoint) -> LinkKey {
    LinkKey::new(src, dst)
}

/// Direct link description without annotations
pub fn direct(src: ConnectPoint, dst: ConnectPoint) -> LinkDescription {
    LinkDescription::new(src, dst, LinkType::Direct)
}

/// Indirect link description without annotations
pub fn indirect(src: ConnectPoint, dst: ConnectPoint) -> LinkDescription {
    LinkDescription::new(src, dst, LinkType::Indirect)
}

/// Non-ancillary provider used as the primary in most tests
pub fn primary_provider() -> ProviderId {
    ProviderId::new("lldp", "core")
}

/// Second non-ancillary provider
pub fn secondary_provider() -> ProviderId {
    ProviderId::new("bgpls", "core")
}

/// Ancillary provider
pub fn ancillary_provider() -> ProviderId {
    ProviderId::ancillary("optical", "config")
}

/// Timestamp in term 1
pub fn ts(sequence: u64) -> Timestamp {
    Timestamp::new(1, sequence)
}

/// `description` stamped at sequence `sequence`
pub fn stamped(description: LinkDescription, sequence: u64) -> Timestamped<LinkDescription> {
    Timestamped::new(description, ts(sequence))
}
