//! Annotated genomic features and their attribute tables.

use crate::error::Error;
use crate::location::Location;

/// Multi-valued attribute table. Keys may repeat and keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, Option<String>)>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one key/value pair.
    ///
    /// A leading `/` on the key (EMBL qualifier syntax) and surrounding double
    /// quotes on the value are removed. Empty keys are ignored.
    pub fn push(&mut self, key: &str, value: Option<&str>) {
        let key = key.strip_prefix('/').unwrap_or(key);
        if key.is_empty() {
            return;
        }
        let value = value.map(|v| {
            let v = v.strip_prefix('"').unwrap_or(v);
            v.strip_suffix('"').unwrap_or(v).to_string()
        });
        self.entries.push((key.to_string(), value));
    }

    /// Adds a pair exactly as given, bypassing normalization.
    pub(crate) fn push_raw(&mut self, key: String, value: Option<String>) {
        self.entries.push((key, value));
    }

    /// All values for `key`, in insertion order. Valueless entries are skipped.
    pub fn values<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + use<'a, 'k> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .filter_map(|(_, v)| v.as_deref())
    }

    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .find_map(|(_, v)| v.as_deref())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One annotated genomic element. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    feature_type: String,
    chromosome_name: String,
    location: Location,
    attributes: Attributes,
}

impl Feature {
    #[must_use]
    pub fn new(
        feature_type: impl Into<String>,
        chromosome_name: impl Into<String>,
        location: Location,
        attributes: Attributes,
    ) -> Self {
        Self {
            feature_type: feature_type.into(),
            chromosome_name: chromosome_name.into(),
            location,
            attributes,
        }
    }

    #[must_use]
    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }

    #[must_use]
    pub fn chromosome_name(&self) -> &str {
        &self.chromosome_name
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Display name chosen from the most informative attribute.
    ///
    /// Falls back to the feature ID, then to the `start..end` coordinates.
    #[must_use]
    pub fn name(&self) -> String {
        match best_name(&self.attributes) {
            Some(name) => name,
            None => match best_id(&self.attributes) {
                Some(id) => id,
                None => format!("{}..{}", self.location.start(), self.location.end()),
            },
        }
    }

    /// Stable identifier (`ID`, `transcript_id`, `gene_id`, `gene`), else the name.
    #[must_use]
    pub fn id(&self) -> String {
        best_id(&self.attributes).unwrap_or_else(|| self.name())
    }

    #[must_use]
    pub fn description(&self) -> &str {
        match self.attributes.first("description") {
            Some(d) if !d.is_empty() => d,
            _ => "No description",
        }
    }
}

/// Priority of attributes competing to name a feature. Lower wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum NameSource {
    Name,
    DbXref,
    Gene,
    StandardName,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IdSource {
    Id,
    Transcript,
    GeneId,
    Gene,
}

fn best_name(attributes: &Attributes) -> Option<String> {
    let mut best: Option<(NameSource, String)> = None;
    for (key, value) in attributes.iter() {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        let candidate = match key.to_lowercase().as_str() {
            "name" => Some((NameSource::Name, value.to_string())),
            "dbxref" if value.contains("Gene_name") => value
                .split(':')
                .nth(1)
                .map(|v| (NameSource::Name, v.to_string())),
            "db_xref" if value.contains("MarkerSymbol") => value
                .split(':')
                .nth(1)
                .map(|v| (NameSource::DbXref, v.to_string())),
            "gene" => Some((NameSource::Gene, value.to_string())),
            "standard_name" => Some((NameSource::StandardName, value.to_string())),
            "note" => Some((NameSource::Note, value.to_string())),
            _ => None,
        };
        if let Some((source, name)) = candidate
            && best.as_ref().is_none_or(|(current, _)| source < *current)
        {
            best = Some((source, name.replace('"', "")));
        }
    }
    best.map(|(_, name)| name)
}

fn best_id(attributes: &Attributes) -> Option<String> {
    let mut best: Option<(IdSource, String)> = None;
    for (key, value) in attributes.iter() {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        let candidate = match key.to_lowercase().as_str() {
            "id" => Some((IdSource::Id, value.to_string())),
            "transcript_id" => Some((IdSource::Transcript, value.to_string())),
            "note" => value
                .strip_prefix("transcript_id=")
                .map(|v| (IdSource::Transcript, v.to_string())),
            "gene_id" => Some((IdSource::GeneId, value.to_string())),
            "gene" => Some((IdSource::Gene, value.to_string())),
            _ => None,
        };
        if let Some((source, id)) = candidate
            && best.as_ref().is_none_or(|(current, _)| source < *current)
        {
            best = Some((source, id.replace('"', "")));
        }
    }
    best.map(|(_, id)| id)
}

/// Accumulates a feature while its source records are being read.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    feature_type: String,
    chromosome_name: String,
    location: Option<Location>,
    attributes: Attributes,
}

impl FeatureBuilder {
    #[must_use]
    pub fn new(feature_type: impl Into<String>, chromosome_name: impl Into<String>) -> Self {
        Self {
            feature_type: feature_type.into(),
            chromosome_name: chromosome_name.into(),
            location: None,
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }

    pub fn add_attribute(&mut self, key: &str, value: Option<&str>) {
        self.attributes.push(key, value);
    }

    /// Sets the location. A location can only be set once.
    pub fn set_location(&mut self, location: Location) -> Result<(), Error> {
        if self.location.is_some() {
            return Err(Error::Validation(format!(
                "location already set for {} feature on {}",
                self.feature_type, self.chromosome_name
            )));
        }
        self.location = Some(location);
        Ok(())
    }

    /// Builds the feature, or returns `None` if no location was ever set.
    #[must_use]
    pub fn build(self) -> Option<Feature> {
        let location = self.location?;
        Some(Feature {
            feature_type: self.feature_type,
            chromosome_name: self.chromosome_name,
            location,
            attributes: self.attributes,
        })
    }

    /// Builds the feature with `location`, replacing any location already set.
    #[must_use]
    pub fn build_with(self, location: Location) -> Feature {
        Feature {
            feature_type: self.feature_type,
            chromosome_name: self.chromosome_name,
            location,
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::Strand;

    fn feature_with(attrs: &[(&str, Option<&str>)]) -> Feature {
        let mut builder = FeatureBuilder::new("gene", "1");
        for (k, v) in attrs {
            builder.add_attribute(k, *v);
        }
        builder
            .set_location(Location::simple(100, 200, Strand::Forward))
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn looked_up_values_outlive_the_key() {
        let mut attributes = Attributes::new();
        attributes.push("gene", Some("ABC"));
        attributes.push("gene", Some("DEF"));
        let first = {
            let key = String::from("gene");
            attributes.first(&key)
        };
        let all: Vec<&str> = {
            let key = String::from("gene");
            attributes.values(&key).collect()
        };
        assert_eq!(first, Some("ABC"));
        assert_eq!(all, vec!["ABC", "DEF"]);
    }

    #[test]
    fn attributes_keep_repeats_in_order() {
        let mut attributes = Attributes::new();
        attributes.push("note", Some("first"));
        attributes.push("gene", Some("ABC"));
        attributes.push("note", Some("second"));
        attributes.push("pseudo", None);
        let notes: Vec<&str> = attributes.values("note").collect();
        assert_eq!(notes, vec!["first", "second"]);
        assert!(attributes.contains_key("pseudo"));
        assert_eq!(attributes.first("pseudo"), None);
        assert_eq!(attributes.len(), 4);
    }

    #[test]
    fn attribute_normalization() {
        let mut attributes = Attributes::new();
        attributes.push("/gene", Some("\"BRCA2\""));
        attributes.push("/", Some("ignored"));
        assert_eq!(attributes.first("gene"), Some("BRCA2"));
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn location_set_once() {
        let mut builder = FeatureBuilder::new("CDS", "X");
        builder
            .set_location(Location::simple(1, 2, Strand::Forward))
            .unwrap();
        assert!(
            builder
                .set_location(Location::simple(3, 4, Strand::Forward))
                .is_err()
        );
    }

    #[test]
    fn build_without_location() {
        assert!(FeatureBuilder::new("CDS", "X").build().is_none());
    }

    #[test]
    fn name_priority() {
        let feature = feature_with(&[
            ("note", Some("some note")),
            ("gene", Some("TP53")),
            ("Name", Some("TP53-201")),
        ]);
        assert_eq!(feature.name(), "TP53-201");

        let feature = feature_with(&[("note", Some("some note")), ("gene", Some("TP53"))]);
        assert_eq!(feature.name(), "TP53");

        let feature = feature_with(&[("db_xref", Some("MarkerSymbol:Kit"))]);
        assert_eq!(feature.name(), "Kit");
    }

    #[test]
    fn name_falls_back_to_id_then_coordinates() {
        let feature = feature_with(&[("ID", Some("gene-1"))]);
        assert_eq!(feature.name(), "gene-1");
        let feature = feature_with(&[]);
        assert_eq!(feature.name(), "100..200");
    }

    #[test]
    fn id_priority() {
        let feature = feature_with(&[
            ("gene_id", Some("ENSG1")),
            ("transcript_id", Some("ENST1")),
        ]);
        assert_eq!(feature.id(), "ENST1");
        let feature = feature_with(&[("note", Some("transcript_id=ENST9"))]);
        assert_eq!(feature.id(), "ENST9");
    }

    #[test]
    fn description_default() {
        assert_eq!(feature_with(&[]).description(), "No description");
        let feature = feature_with(&[("description", Some("kinase"))]);
        assert_eq!(feature.description(), "kinase");
    }
}
