//! A single genome: its chromosomes, name resolution and annotation.

pub mod translator;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::annotation::AnnotationCollection;
use crate::chromosome::Chromosome;
use crate::error::Error;

pub use translator::{ChromosomeWithOffset, NameTranslator};

/// One genome directory (`<base>/<species>/<assembly>`) and everything loaded from it.
#[derive(Debug)]
pub struct Genome {
    base_dir: PathBuf,
    species: String,
    assembly: String,
    chromosomes: Vec<Chromosome>,
    name_to_index: HashMap<String, usize>,
    translator: NameTranslator,
    unloaded_feature_types: BTreeSet<String>,
    annotations: AnnotationCollection,
}

impl Genome {
    /// Creates an empty genome for `base_dir`, which must be an existing directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let base_dir = base_dir.into();
        if !base_dir.is_dir() {
            return Err(Error::Validation(format!(
                "genome directory {} does not exist",
                base_dir.display()
            )));
        }

        let assembly = file_name(&base_dir).ok_or_else(|| {
            Error::Validation(format!("cannot derive assembly from {}", base_dir.display()))
        })?;
        let species = base_dir.parent().and_then(file_name).unwrap_or_default();

        Ok(Self {
            base_dir,
            species,
            assembly,
            chromosomes: Vec::new(),
            name_to_index: HashMap::new(),
            translator: NameTranslator::new(),
            unloaded_feature_types: BTreeSet::new(),
            annotations: AnnotationCollection::new(),
        })
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn species(&self) -> &str {
        &self.species
    }

    #[must_use]
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// Returns the index of the chromosome called `name`, creating it if no
    /// existing chromosome matches.
    pub fn add_chromosome(&mut self, name: &str) -> usize {
        let name_to_index = &self.name_to_index;
        if let Some(found) = self
            .translator
            .resolve(name, |n| name_to_index.get(n).copied(), false)
        {
            return found.index;
        }

        let index = self.chromosomes.len();
        self.chromosomes.push(Chromosome::new(name));
        self.name_to_index.insert(name.to_string(), index);
        index
    }

    /// Resolves a sequence name as written in an annotation file. Failed
    /// lookups are remembered so each unknown name is only searched for once.
    pub fn resolve(&mut self, name: &str) -> Option<ChromosomeWithOffset> {
        let name_to_index = &self.name_to_index;
        self.translator
            .resolve(name, |n| name_to_index.get(n).copied(), true)
    }

    /// Maps `alias` onto the chromosome called `canonical`, shifting coordinates by `offset`.
    pub fn add_alias(&mut self, alias: &str, canonical: &str, offset: i64) -> Result<(), Error> {
        let index = self.name_to_index.get(canonical).copied().ok_or_else(|| {
            Error::Validation(format!(
                "alias '{alias}' refers to unknown chromosome '{canonical}'"
            ))
        })?;
        self.translator
            .add_alias(alias, ChromosomeWithOffset { index, offset });
        Ok(())
    }

    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.translator.alias_count()
    }

    #[must_use]
    pub fn chromosome(&self, index: usize) -> Option<&Chromosome> {
        self.chromosomes.get(index)
    }

    pub fn chromosome_mut(&mut self, index: usize) -> Option<&mut Chromosome> {
        self.chromosomes.get_mut(index)
    }

    /// Looks up a chromosome by its exact name, without any name heuristics.
    #[must_use]
    pub fn exact_chromosome(&self, name: &str) -> Option<&Chromosome> {
        self.name_to_index
            .get(name)
            .and_then(|&index| self.chromosomes.get(index))
    }

    /// All chromosomes in natural order.
    #[must_use]
    pub fn chromosomes(&self) -> Vec<&Chromosome> {
        let mut chromosomes: Vec<&Chromosome> = self.chromosomes.iter().collect();
        chromosomes.sort();
        chromosomes
    }

    #[must_use]
    pub fn chromosome_count(&self) -> usize {
        self.chromosomes.len()
    }

    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.chromosomes.iter().map(|c| u64::from(c.length())).sum()
    }

    #[must_use]
    pub fn longest_chromosome(&self) -> Option<&Chromosome> {
        self.chromosomes.iter().max_by_key(|c| c.length())
    }

    /// Records a feature type that was present in the source files but not loaded.
    pub fn add_unloaded_feature_type(&mut self, feature_type: &str) {
        if !self.unloaded_feature_types.contains(feature_type) {
            self.unloaded_feature_types.insert(feature_type.to_string());
        }
    }

    pub fn unloaded_feature_types(&self) -> impl Iterator<Item = &str> {
        self.unloaded_feature_types.iter().map(String::as_str)
    }

    #[must_use]
    pub fn annotations(&self) -> &AnnotationCollection {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationCollection {
        &mut self.annotations
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
