//! Per-link provider descriptors and the composer
//!
//! Each link keeps one timestamped description per provider. A provider's
//! entry only moves forward in time. The visible [`Link`] is composed from
//! all entries:
//!
//! 1. the primary is the first non-ancillary provider in `ProviderId` order,
//!    or the first entry when every provider is ancillary
//! 2. endpoints and type come from the primary
//! 3. annotations start from the primary's; other providers, in
//!    `ProviderId` order, only fill keys that are still missing

use linkstate_core::{Link, LinkDescription, ProviderId, Timestamp, Timestamped};
use std::collections::BTreeMap;

/// Every provider's latest description of one link, ordered by provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderDescriptors {
    entries: BTreeMap<ProviderId, Timestamped<LinkDescription>>,
}

impl ProviderDescriptors {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// No provider reports the link
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of reporting providers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `provider`'s entry
    pub fn get(&self, provider: &ProviderId) -> Option<&Timestamped<LinkDescription>> {
        self.entries.get(provider)
    }

    /// Entries in provider order
    pub fn iter(&self) -> impl Iterator<Item = (&ProviderId, &Timestamped<LinkDescription>)> {
        self.entries.iter()
    }

    /// Store `description` if it is strictly newer than the provider's entry
    ///
    /// Returns whether the entry was replaced.
    pub fn offer(
        &mut self,
        provider: &ProviderId,
        description: Timestamped<LinkDescription>,
    ) -> bool {
        if let Some(existing) = self.entries.get(provider) {
            if !description.is_newer(existing) {
                return false;
            }
        }
        self.entries.insert(provider.clone(), description);
        true
    }

    /// Primary entry, falling back to the first when all are ancillary
    pub fn primary(&self) -> Option<(&ProviderId, &Timestamped<LinkDescription>)> {
        self.entries
            .iter()
            .find(|(provider, _)| !provider.is_ancillary())
            .or_else(|| self.entries.iter().next())
    }

    /// Timestamp of the primary entry
    pub fn primary_timestamp(&self) -> Option<Timestamp> {
        self.primary().map(|(_, description)| description.timestamp())
    }

    /// Merged view of every entry, `None` when there are none
    pub fn compose(&self) -> Option<Link> {
        let (primary_id, primary) = self.primary()?;
        let base = primary.value();

        let mut annotations = base.annotations().clone();
        for (provider, description) in &self.entries {
            if provider == primary_id {
                continue;
            }
            for (key, value) in description.value().annotations() {
                annotations
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        Some(Link::new(
            base.src().clone(),
            base.dst().clone(),
            base.link_type(),
            annotations,
            primary_id.clone(),
        ))
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstate_core::LinkType;
    use linkstate_testkit::fixtures::{
        ancillary_provider, cp, direct, indirect, primary_provider, secondary_provider, stamped,
    };

    fn a_to_b() -> (linkstate_core::ConnectPoint, linkstate_core::ConnectPoint) {
        (cp("of:a", 1), cp("of:b", 2))
    }

    #[test]
    fn provider_entries_only_move_forward() {
        let (src, dst) = a_to_b();
        let mut descs = ProviderDescriptors::new();

        assert!(descs.offer(&primary_provider(), stamped(indirect(src.clone(), dst.clone()), 5)));
        assert!(!descs.offer(&primary_provider(), stamped(direct(src.clone(), dst.clone()), 5)));
        assert!(!descs.offer(&primary_provider(), stamped(direct(src.clone(), dst.clone()), 4)));
        assert_eq!(
            descs.compose().unwrap().link_type(),
            LinkType::Indirect
        );

        assert!(descs.offer(&primary_provider(), stamped(direct(src, dst), 6)));
        assert_eq!(descs.compose().unwrap().link_type(), LinkType::Direct);
    }

    #[test]
    fn non_ancillary_provider_is_primary() {
        let (src, dst) = a_to_b();
        let mut descs = ProviderDescriptors::new();
        descs.offer(&ancillary_provider(), stamped(direct(src.clone(), dst.clone()), 1));
        descs.offer(&primary_provider(), stamped(indirect(src, dst), 2));

        let link = descs.compose().unwrap();
        assert_eq!(link.provider_id(), &primary_provider());
        assert_eq!(link.link_type(), LinkType::Indirect);
        assert_eq!(descs.primary_timestamp(), Some(linkstate_testkit::fixtures::ts(2)));
    }

    #[test]
    fn ancillary_only_links_fall_back_to_first_entry() {
        let (src, dst) = a_to_b();
        let mut descs = ProviderDescriptors::new();
        descs.offer(&ancillary_provider(), stamped(direct(src, dst), 1));

        assert_eq!(descs.compose().unwrap().provider_id(), &ancillary_provider());
    }

    #[test]
    fn primary_annotations_win_and_others_fill_gaps() {
        let (src, dst) = a_to_b();
        let mut descs = ProviderDescriptors::new();
        descs.offer(
            &primary_provider(),
            stamped(direct(src.clone(), dst.clone()).with_annotation("bw", "10G"), 1),
        );
        descs.offer(
            &secondary_provider(),
            stamped(
                direct(src.clone(), dst.clone())
                    .with_annotation("bw", "40G")
                    .with_annotation("metric", "7"),
                2,
            ),
        );
        descs.offer(
            &ancillary_provider(),
            stamped(
                direct(src, dst)
                    .with_annotation("metric", "9")
                    .with_annotation("layer", "optical"),
                3,
            ),
        );

        // secondary sorts before primary ("bgpls" < "lldp"), so it is the primary
        let link = descs.compose().unwrap();
        assert_eq!(link.provider_id(), &secondary_provider());
        assert_eq!(link.annotations()["bw"], "40G");
        assert_eq!(link.annotations()["metric"], "7");
        assert_eq!(link.annotations()["layer"], "optical");
    }

    #[test]
    fn empty_descriptors_compose_to_nothing() {
        let (src, dst) = a_to_b();
        let mut descs = ProviderDescriptors::new();
        assert!(descs.compose().is_none());

        descs.offer(&primary_provider(), stamped(direct(src, dst), 1));
        descs.clear();
        assert!(descs.is_empty());
        assert!(descs.compose().is_none());
    }
}
