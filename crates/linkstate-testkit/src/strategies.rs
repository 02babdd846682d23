//! Property test strategies for link store types
//!
//! Domains are deliberately small so that generated operations collide on the
//! same links and providers often enough to exercise conflict resolution.

use linkstate_core::{Annotations, ConnectPoint, LinkDescription, LinkType, ProviderId};
use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use crate::fixtures::{ancillary_provider, primary_provider, secondary_provider};

/// One provider-facing store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOp {
    /// `create_or_update_link(provider, description)`
    Put {
        /// Reporting provider
        provider: ProviderId,
        /// Reported description
        description: LinkDescription,
    },
    /// `remove_link(src, dst)`
    Remove {
        /// Source endpoint
        src: ConnectPoint,
        /// Destination endpoint
        dst: ConnectPoint,
    },
}

/// Connect points on two devices with two ports each
pub fn arb_connect_point() -> impl Strategy<Value = ConnectPoint> {
    (0u8..2, 1u64..3).prop_map(|(device, port)| ConnectPoint::new(format!("of:{device}"), port))
}

/// One of the fixture providers, ancillary included
pub fn arb_provider() -> impl Strategy<Value = ProviderId> {
    prop_oneof![
        Just(primary_provider()),
        Just(secondary_provider()),
        Just(ancillary_provider()),
    ]
}

/// Either link type
pub fn arb_link_type() -> impl Strategy<Value = LinkType> {
    prop_oneof![Just(LinkType::Direct), Just(LinkType::Indirect)]
}

/// Up to two annotations from a small key/value space
pub fn arb_annotations() -> impl Strategy<Value = Annotations> {
    proptest::collection::btree_map(
        prop_oneof![Just("bw".to_string()), Just("latency".to_string())],
        prop_oneof![Just("1".to_string()), Just("10".to_string())],
        0..=2,
    )
}

/// Description with distinct endpoints
pub fn arb_description() -> impl Strategy<Value = LinkDescription> {
    (
        arb_connect_point(),
        arb_connect_point(),
        arb_link_type(),
        arb_annotations(),
    )
        .prop_filter("endpoints must differ", |(src, dst, _, _)| src != dst)
        .prop_map(|(src, dst, link_type, annotations)| {
            LinkDescription::new(src, dst, link_type).with_annotations(annotations)
        })
}

/// Value for the `layer` annotation that ancillary providers report
pub fn arb_layer() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("optical"), Just("packet")]
}

/// Puts three times as often as removes
///
/// Ancillary puts always carry a `layer` annotation, so losing an ancillary
/// fragment is visible in the composed link.
pub fn arb_link_op() -> impl Strategy<Value = LinkOp> {
    prop_oneof![
        3 => (arb_provider(), arb_description(), arb_layer()).prop_map(
            |(provider, description, layer)| {
                let description = if provider.is_ancillary() {
                    description.with_annotation("layer", layer)
                } else {
                    description
                };
                LinkOp::Put { provider, description }
            }
        ),
        1 => arb_description().prop_map(|description| LinkOp::Remove {
            src: description.src().clone(),
            dst: description.dst().clone(),
        }),
    ]
}

/// Sequence of operations, each tagged with the replica index it runs on
pub fn arb_replicated_ops(
    replicas: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<(usize, LinkOp)>> {
    proptest::collection::vec((0..replicas.max(1), arb_link_op()), 1..=max_ops.max(1))
}
