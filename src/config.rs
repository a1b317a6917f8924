use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::annotation::DEFAULT_ANNOTATION_SET_SIZE;
use crate::loader::LoaderOptions;

const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    pub genome_base: PathBuf,
    /// Genome directories relative to `genome_base`, e.g. `Homo_sapiens/GRCh38`.
    pub genomes: Vec<PathBuf>,
    #[serde(default)]
    pub ignored_feature_types: Vec<String>,
    #[serde(default = "default_annotation_set_size")]
    pub annotation_set_size: usize,
    #[serde(default)]
    pub gff_feature_prefix: String,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_annotation_set_size() -> usize {
    DEFAULT_ANNOTATION_SET_SIZE
}

fn default_progress_interval() -> usize {
    DEFAULT_PROGRESS_INTERVAL
}

impl LoaderConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.genomes.is_empty() {
            bail!("no genomes listed in config");
        }
        for genome in &self.genomes {
            if genome.is_absolute() {
                bail!(
                    "genome directory '{}' must be relative to genomeBase",
                    genome.display()
                );
            }
        }
        if self.annotation_set_size == 0 {
            bail!("annotationSetSize must be greater than zero");
        }
        if self.progress_interval == 0 {
            bail!("progressInterval must be greater than zero");
        }
        if let Some(empty) = self.ignored_feature_types.iter().position(|t| t.trim().is_empty()) {
            bail!("ignoredFeatureTypes entry {empty} is empty");
        }
        Ok(())
    }

    /// Absolute genome directories in config order.
    #[must_use]
    pub fn genome_dirs(&self) -> Vec<PathBuf> {
        self.genomes
            .iter()
            .map(|genome| self.genome_base.join(genome))
            .collect()
    }

    #[must_use]
    pub fn to_options(&self) -> LoaderOptions {
        LoaderOptions {
            ignored_feature_types: self
                .ignored_feature_types
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            annotation_set_size: self.annotation_set_size,
            gff_prefix: self.gff_feature_prefix.clone(),
            progress_interval: self.progress_interval,
            ..LoaderOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn valid_config_all_fields() {
        let json = r#"{
            "genomeBase": "/data/genomes",
            "genomes": ["Homo_sapiens/GRCh38", "Mus_musculus/GRCm39"],
            "ignoredFeatureTypes": ["Repeat_Region", "misc_feature"],
            "annotationSetSize": 50000,
            "gffFeaturePrefix": "ens_",
            "progressInterval": 250
        }"#;
        let f = write_config(json);
        let config = LoaderConfig::from_file(f.path()).unwrap();
        assert_eq!(
            config.genome_dirs(),
            vec![
                PathBuf::from("/data/genomes/Homo_sapiens/GRCh38"),
                PathBuf::from("/data/genomes/Mus_musculus/GRCm39"),
            ]
        );

        let options = config.to_options();
        assert_eq!(options.ignored_feature_types, vec!["repeat_region", "misc_feature"]);
        assert_eq!(options.annotation_set_size, 50000);
        assert_eq!(options.gff_prefix, "ens_");
        assert_eq!(options.progress_interval, 250);
        assert_eq!(options.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn valid_config_optional_fields_omitted() {
        let json = r#"{
            "genomeBase": "/data/genomes",
            "genomes": ["Homo_sapiens/GRCh38"]
        }"#;
        let f = write_config(json);
        let config = LoaderConfig::from_file(f.path()).unwrap();
        assert!(config.ignored_feature_types.is_empty());
        assert_eq!(config.annotation_set_size, 1_000_000);
        assert_eq!(config.progress_interval, 1000);
        assert!(config.gff_feature_prefix.is_empty());
    }

    #[test]
    fn empty_genome_list() {
        let json = r#"{ "genomeBase": "/data", "genomes": [] }"#;
        let f = write_config(json);
        let err = LoaderConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("no genomes"));
    }

    #[test]
    fn absolute_genome_directory() {
        let json = r#"{ "genomeBase": "/data", "genomes": ["/elsewhere/GRCh38"] }"#;
        let f = write_config(json);
        let err = LoaderConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("must be relative"));
    }

    #[test]
    fn zero_annotation_set_size() {
        let json = r#"{ "genomeBase": "/data", "genomes": ["a/b"], "annotationSetSize": 0 }"#;
        let f = write_config(json);
        let err = LoaderConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("annotationSetSize"));
    }

    #[test]
    fn malformed_json() {
        let f = write_config("{ genomeBase: ");
        let err = LoaderConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }
}
