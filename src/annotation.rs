//! Annotation sets: features indexed by chromosome and feature type.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::cache::reader::FeatureCacheReader;
use crate::error::Error;
use crate::feature::Feature;

/// Features per GFF set before the reader opens a new one.
pub const DEFAULT_ANNOTATION_SET_SIZE: usize = 1_000_000;

/// The features of one (chromosome, type) pair.
#[derive(Debug)]
enum TypeCollection {
    InMemory(Vec<Feature>),
    /// Loaded from the cache file on each query.
    Cached { path: PathBuf, count: Option<usize> },
}

impl TypeCollection {
    fn features(&self) -> Result<Vec<Feature>, Error> {
        match self {
            Self::InMemory(features) => Ok(features.clone()),
            Self::Cached { path, .. } => Ok(FeatureCacheReader::read_file(path)?.features),
        }
    }

    fn count(&self) -> usize {
        match self {
            Self::InMemory(features) => features.len(),
            Self::Cached { count, .. } => count.unwrap_or(0),
        }
    }
}

/// A named collection of features.
///
/// Features are added while the set is being built. After [`finalise`] the set
/// is read-only.
///
/// [`finalise`]: AnnotationSet::finalise
#[derive(Debug)]
pub struct AnnotationSet {
    name: String,
    features: BTreeMap<String, BTreeMap<String, TypeCollection>>,
    finalised: bool,
}

impl AnnotationSet {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: BTreeMap::new(),
            finalised: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_finalised(&self) -> bool {
        self.finalised
    }

    pub fn add_feature(&mut self, feature: Feature) -> Result<(), Error> {
        if self.finalised {
            return Err(Error::Validation(format!(
                "can't add features to finalised annotation set '{}'",
                self.name
            )));
        }

        let collection = self
            .features
            .entry(feature.chromosome_name().to_string())
            .or_default()
            .entry(feature.feature_type().to_string())
            .or_insert_with(|| TypeCollection::InMemory(Vec::new()));

        match collection {
            TypeCollection::InMemory(features) => features.push(feature),
            TypeCollection::Cached { path, .. } => {
                return Err(Error::Validation(format!(
                    "{} features on {} are already backed by {}",
                    feature.feature_type(),
                    feature.chromosome_name(),
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Seals the set against further additions. Calling it again has no effect.
    pub fn finalise(&mut self) {
        if self.finalised {
            return;
        }
        for types in self.features.values_mut() {
            for collection in types.values_mut() {
                if let TypeCollection::InMemory(features) = collection {
                    features.shrink_to_fit();
                }
            }
        }
        self.finalised = true;
    }

    /// Registers a cache file as the source of a (chromosome, type) pair. The
    /// file is only read when that pair is queried.
    pub fn add_cached_file(
        &mut self,
        chromosome: &str,
        feature_type: &str,
        path: impl Into<PathBuf>,
        count: Option<usize>,
    ) {
        self.features
            .entry(chromosome.to_string())
            .or_default()
            .insert(
                feature_type.to_string(),
                TypeCollection::Cached {
                    path: path.into(),
                    count,
                },
            );
    }

    /// Swaps the in-memory features of a pair for the cache file they were written to.
    pub(crate) fn mark_cached(&mut self, chromosome: &str, feature_type: &str, path: &Path) {
        if let Some(collection) = self
            .features
            .get_mut(chromosome)
            .and_then(|types| types.get_mut(feature_type))
        {
            let count = collection.count();
            *collection = TypeCollection::Cached {
                path: path.to_path_buf(),
                count: Some(count),
            };
        }
    }

    /// (chromosome, type, features) for every pair still held in memory.
    pub(crate) fn in_memory(&self) -> impl Iterator<Item = (&str, &str, &[Feature])> {
        self.features.iter().flat_map(|(chromosome, types)| {
            types.iter().filter_map(move |(feature_type, collection)| match collection {
                TypeCollection::InMemory(features) => {
                    Some((chromosome.as_str(), feature_type.as_str(), features.as_slice()))
                }
                TypeCollection::Cached { .. } => None,
            })
        })
    }

    #[must_use]
    pub fn chromosome_names(&self) -> Vec<&str> {
        self.features.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn feature_types(&self) -> BTreeSet<&str> {
        self.features
            .values()
            .flat_map(|types| types.keys().map(String::as_str))
            .collect()
    }

    /// Number of features, counting cache-backed pairs whose size is known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features
            .values()
            .flat_map(BTreeMap::values)
            .map(TypeCollection::count)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features of one type on one chromosome. A broken cache file only fails this query.
    pub fn features_for_type(
        &self,
        chromosome: &str,
        feature_type: &str,
    ) -> Result<Vec<Feature>, Error> {
        match self
            .features
            .get(chromosome)
            .and_then(|types| types.get(feature_type))
        {
            Some(collection) => collection.features(),
            None => Ok(Vec::new()),
        }
    }

    /// Features of one type across all chromosomes, in chromosome-name order.
    pub fn features_of_type(&self, feature_type: &str) -> Result<Vec<Feature>, Error> {
        let mut features = Vec::new();
        for types in self.features.values() {
            if let Some(collection) = types.get(feature_type) {
                features.extend(collection.features()?);
            }
        }
        Ok(features)
    }

    pub fn all_features(&self) -> Result<Vec<Feature>, Error> {
        let mut features = Vec::new();
        for collection in self.features.values().flat_map(BTreeMap::values) {
            features.extend(collection.features()?);
        }
        Ok(features)
    }

    /// Consumes the set, yielding every feature it holds.
    pub fn into_features(self) -> Result<Vec<Feature>, Error> {
        let mut features = Vec::new();
        for collection in self.features.into_values().flat_map(BTreeMap::into_values) {
            match collection {
                TypeCollection::InMemory(held) => features.extend(held),
                cached @ TypeCollection::Cached { .. } => features.extend(cached.features()?),
            }
        }
        Ok(features)
    }
}

/// The annotation sets registered with a genome.
#[derive(Debug, Default)]
pub struct AnnotationCollection {
    sets: Vec<AnnotationSet>,
}

impl AnnotationCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalises each set and appends them all in one step.
    pub fn add_sets(&mut self, mut sets: Vec<AnnotationSet>) {
        for set in &mut sets {
            set.finalise();
        }
        self.sets.append(&mut sets);
    }

    #[must_use]
    pub fn sets(&self) -> &[AnnotationSet] {
        &self.sets
    }

    #[must_use]
    pub fn feature_types(&self) -> BTreeSet<&str> {
        self.sets.iter().flat_map(AnnotationSet::feature_types).collect()
    }

    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.sets.iter().map(AnnotationSet::len).sum()
    }

    pub fn features_for_type(
        &self,
        chromosome: &str,
        feature_type: &str,
    ) -> Result<Vec<Feature>, Error> {
        let mut features = Vec::new();
        for set in &self.sets {
            features.extend(set.features_for_type(chromosome, feature_type)?);
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureBuilder;
    use crate::location::Location;
    use crate::strand::Strand;

    fn feature(chromosome: &str, feature_type: &str, start: u32) -> Feature {
        let mut builder = FeatureBuilder::new(feature_type, chromosome);
        builder
            .set_location(Location::simple(start, start + 10, Strand::Forward))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn indexed_by_chromosome_and_type() {
        let mut set = AnnotationSet::new("Core genome");
        set.add_feature(feature("1", "gene", 10)).unwrap();
        set.add_feature(feature("1", "mRNA", 20)).unwrap();
        set.add_feature(feature("2", "gene", 30)).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.chromosome_names(), vec!["1", "2"]);
        assert_eq!(set.feature_types().into_iter().collect::<Vec<_>>(), vec!["gene", "mRNA"]);
        assert_eq!(set.features_for_type("1", "gene").unwrap().len(), 1);
        assert_eq!(set.features_of_type("gene").unwrap().len(), 2);
        assert!(set.features_for_type("3", "gene").unwrap().is_empty());
    }

    #[test]
    fn finalised_set_rejects_features() {
        let mut set = AnnotationSet::new("test");
        set.add_feature(feature("1", "gene", 10)).unwrap();
        set.finalise();
        set.finalise();
        assert!(set.is_finalised());
        assert!(set.add_feature(feature("1", "gene", 50)).is_err());
        assert_eq!(set.all_features().unwrap().len(), 1);
    }

    #[test]
    fn missing_cache_file_fails_only_its_pair() {
        let mut set = AnnotationSet::new("Core genome");
        set.add_feature(feature("1", "gene", 10)).unwrap();
        set.add_cached_file("2", "gene", "/nonexistent/2%gene.cache", None);
        assert!(set.features_for_type("2", "gene").is_err());
        assert_eq!(set.features_for_type("1", "gene").unwrap().len(), 1);
    }

    #[test]
    fn collection_appends_finalised_sets() {
        let mut first = AnnotationSet::new("a");
        first.add_feature(feature("1", "gene", 10)).unwrap();
        let mut second = AnnotationSet::new("b");
        second.add_feature(feature("1", "gene", 40)).unwrap();

        let mut collection = AnnotationCollection::new();
        collection.add_sets(vec![first, second]);
        assert_eq!(collection.sets().len(), 2);
        assert!(collection.sets().iter().all(AnnotationSet::is_finalised));
        assert_eq!(collection.feature_count(), 2);
        assert_eq!(collection.features_for_type("1", "gene").unwrap().len(), 2);
    }
}
