//! Reassembly of spliced features from independent GFF/GTF records.
//!
//! Records sharing a grouping key contribute one sublocation each to a single
//! feature. Groups are flushed at end of file in the order they were first seen.

use std::collections::HashMap;

use crate::error::Error;
use crate::feature::{Feature, FeatureBuilder};
use crate::location::{Interval, Location};

/// Grouping key: the (unprefixed) feature type and the shared identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub feature_type: String,
    pub id: String,
}

impl GroupKey {
    #[must_use]
    pub fn new(feature_type: &str, id: &str) -> Self {
        Self {
            feature_type: feature_type.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug)]
struct FeatureGroup {
    builder: FeatureBuilder,
    /// Location of the record that registered the group by `ID`, used when no
    /// child ever adds a sublocation.
    fallback: Option<Interval>,
    sublocations: Vec<Interval>,
}

impl FeatureGroup {
    fn into_feature(self) -> Result<Option<Feature>, Error> {
        let location = match self.sublocations.len() {
            0 => match self.fallback {
                Some(interval) => Location::Simple(interval),
                None => return Ok(None),
            },
            _ => Location::from_parts(self.sublocations)?,
        };
        Ok(Some(self.builder.build_with(location)))
    }
}

/// Running table of feature groups for one file.
#[derive(Debug, Default)]
pub struct FeatureGrouper {
    index: HashMap<GroupKey, usize>,
    groups: Vec<FeatureGroup>,
}

impl FeatureGrouper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `interval` to the group for `key`, creating the group with
    /// `make_builder` on first sight.
    pub fn add_sublocation<F>(&mut self, key: GroupKey, interval: Interval, make_builder: F)
    where
        F: FnOnce() -> FeatureBuilder,
    {
        let index = match self.index.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.groups.len();
                self.groups.push(FeatureGroup {
                    builder: make_builder(),
                    fallback: None,
                    sublocations: Vec::new(),
                });
                self.index.insert(key, index);
                index
            }
        };
        self.groups[index].sublocations.push(interval);
    }

    /// Registers a record that may later be referenced as a parent.
    ///
    /// If children already created the group, the record takes it over and
    /// keeps their sublocations. If another record already registered the same
    /// key, the builder is handed back so the caller can add it on its own.
    pub fn register(
        &mut self,
        key: GroupKey,
        builder: FeatureBuilder,
        interval: Interval,
    ) -> Option<FeatureBuilder> {
        match self.index.get(&key) {
            Some(&index) => {
                let group = &mut self.groups[index];
                if group.fallback.is_some() {
                    return Some(builder);
                }
                group.builder = builder;
                group.fallback = Some(interval);
                None
            }
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push(FeatureGroup {
                    builder,
                    fallback: Some(interval),
                    sublocations: Vec::new(),
                });
                None
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Builds every group: no sublocations falls back to the registering
    /// record's location, one becomes a simple location, more become split.
    pub fn finish(self) -> Result<Vec<Feature>, Error> {
        let mut features = Vec::with_capacity(self.groups.len());
        for group in self.groups {
            if let Some(feature) = group.into_feature()? {
                features.push(feature);
            }
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::Strand;

    fn interval(start: u32, end: u32) -> Interval {
        Interval::new(start, end, Strand::Forward)
    }

    fn builder(feature_type: &str, id: &str) -> FeatureBuilder {
        let mut builder = FeatureBuilder::new(feature_type, "1");
        builder.add_attribute("ID", Some(id));
        builder
    }

    #[test]
    fn registered_parent_collects_children() {
        let mut grouper = FeatureGrouper::new();
        assert!(
            grouper
                .register(GroupKey::new("mRNA", "m1"), builder("mRNA", "m1"), interval(100, 200))
                .is_none()
        );
        grouper.add_sublocation(GroupKey::new("mRNA", "m1"), interval(160, 200), || {
            builder("mRNA", "unused")
        });
        grouper.add_sublocation(GroupKey::new("mRNA", "m1"), interval(100, 150), || {
            builder("mRNA", "unused")
        });

        let features = grouper.finish().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].attributes().first("ID"), Some("m1"));
        let parts = features[0].location().sublocations();
        assert_eq!(parts, &[interval(100, 150), interval(160, 200)]);
    }

    #[test]
    fn fallback_and_single_part() {
        let mut grouper = FeatureGrouper::new();
        grouper.register(GroupKey::new("gene", "g1"), builder("gene", "g1"), interval(1, 900));
        grouper.add_sublocation(GroupKey::new("CDS", "m1"), interval(10, 20), || {
            builder("CDS", "c1")
        });

        let features = grouper.finish().unwrap();
        assert_eq!(features[0].location(), &Location::Simple(interval(1, 900)));
        assert_eq!(features[1].location(), &Location::Simple(interval(10, 20)));
        assert!(!features[1].location().is_split());
    }

    #[test]
    fn late_parent_adopts_group() {
        let mut grouper = FeatureGrouper::new();
        grouper.add_sublocation(GroupKey::new("mRNA", "m1"), interval(100, 150), || {
            builder("mRNA", "from-exon")
        });
        grouper.register(GroupKey::new("mRNA", "m1"), builder("mRNA", "m1"), interval(100, 200));
        grouper.add_sublocation(GroupKey::new("mRNA", "m1"), interval(160, 200), || {
            builder("mRNA", "unused")
        });

        let features = grouper.finish().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].attributes().first("ID"), Some("m1"));
        assert_eq!(features[0].location().sublocations().len(), 2);
    }

    #[test]
    fn duplicate_registration_returned() {
        let mut grouper = FeatureGrouper::new();
        grouper.register(GroupKey::new("gene", "g1"), builder("gene", "g1"), interval(1, 10));
        let rejected =
            grouper.register(GroupKey::new("gene", "g1"), builder("gene", "g1"), interval(20, 30));
        assert!(rejected.is_some());
        assert_eq!(grouper.len(), 1);
    }

    #[test]
    fn keys_do_not_collide() {
        let mut grouper = FeatureGrouper::new();
        grouper.add_sublocation(GroupKey::new("a_b", "c"), interval(1, 2), || builder("a_b", "x"));
        grouper.add_sublocation(GroupKey::new("a", "b_c"), interval(3, 4), || builder("a", "y"));
        assert_eq!(grouper.len(), 2);
    }
}
