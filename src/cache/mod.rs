//! On-disk annotation cache for a genome directory.
//!
//! A parsed genome is written to `<base>/cache/`: one binary file per
//! (chromosome, feature type) pair, a `chr_list` of chromosome lengths and
//! finally a `cache.complete` marker holding the version that wrote it. The
//! cache is only trusted while the marker matches the running version and no
//! source file in `<base>` is newer than the marker.

pub mod binary_io;
pub mod header;
pub mod key;
pub mod reader;
pub mod writer;

use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::annotation::AnnotationSet;
use crate::error::Error;
use crate::genome::Genome;
use crate::progress::ParseContext;

use key::{CACHE_EXTENSION, decode_cache_file_name, encode_cache_file_name};
use reader::FeatureCacheReader;
use writer::FeatureCacheWriter;

pub const CACHE_DIR: &str = "cache";
pub const COMPLETE_MARKER: &str = "cache.complete";
pub const CHR_LIST: &str = "chr_list";
pub const ALIASES: &str = "aliases.txt";

/// Name of the annotation set holding everything parsed from a genome directory.
pub const CORE_ANNOTATION_NAME: &str = "Core genome";

/// Why an existing cache cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    EmptyVersion,
    VersionMismatch { found: String, expected: String },
    SourceNewer(PathBuf),
    Unreadable(String),
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyVersion => write!(f, "cache marker has no version"),
            Self::VersionMismatch { found, expected } => write!(
                f,
                "version mismatch between cache ('{found}') and current version ('{expected}')"
            ),
            Self::SourceNewer(path) => {
                write!(f, "{} is newer than the cache marker", path.display())
            }
            Self::Unreadable(reason) => write!(f, "cache marker unreadable: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    Missing,
    Valid,
    Invalid(InvalidReason),
}

/// Kind of annotation source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Embl,
    Gff,
}

/// Classifies a file name as an annotation source (`.dat`, `.gff`, `.gff3`,
/// `.gtf`, each optionally gzipped). Matching ignores case.
#[must_use]
pub fn source_kind(file_name: &str) -> Option<SourceKind> {
    let lower = file_name.to_lowercase();
    let stem = lower.strip_suffix(".gz").unwrap_or(&lower);
    if stem.ends_with(".dat") {
        Some(SourceKind::Embl)
    } else if stem.ends_with(".gff") || stem.ends_with(".gff3") || stem.ends_with(".gtf") {
        Some(SourceKind::Gff)
    } else {
        None
    }
}

#[must_use]
pub fn cache_dir(base: &Path) -> PathBuf {
    base.join(CACHE_DIR)
}

#[must_use]
pub fn marker_path(base: &Path) -> PathBuf {
    cache_dir(base).join(COMPLETE_MARKER)
}

/// Annotation source files of `kind` directly inside `base`, sorted by name.
pub fn source_files(base: &Path, kind: Option<SourceKind>) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let found = source_kind(&entry.file_name().to_string_lossy());
        if found.is_some() && (kind.is_none() || found == kind) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Decides whether the cache under `base` can be used by `version`.
///
/// Only listing the genome directory can fail; any problem with the marker
/// itself makes the cache invalid.
pub fn check_cache(base: &Path, version: &str) -> Result<CacheStatus, Error> {
    let marker = marker_path(base);
    if !marker.exists() {
        return Ok(CacheStatus::Missing);
    }

    let first_line = File::open(&marker)
        .and_then(|file| BufReader::new(file).lines().next().transpose());
    let found = match first_line {
        Ok(line) => line.unwrap_or_default(),
        Err(e) => return Ok(CacheStatus::Invalid(InvalidReason::Unreadable(e.to_string()))),
    };
    let found = found.trim();
    if found.is_empty() {
        return Ok(CacheStatus::Invalid(InvalidReason::EmptyVersion));
    }
    if found != version {
        return Ok(CacheStatus::Invalid(InvalidReason::VersionMismatch {
            found: found.to_string(),
            expected: version.to_string(),
        }));
    }

    let marker_time = match fs::metadata(&marker).and_then(|m| m.modified()) {
        Ok(time) => time,
        Err(e) => return Ok(CacheStatus::Invalid(InvalidReason::Unreadable(e.to_string()))),
    };
    for path in source_files(base, None)? {
        let modified = fs::metadata(&path).and_then(|m| m.modified())?;
        if modified > marker_time {
            return Ok(CacheStatus::Invalid(InvalidReason::SourceNewer(path)));
        }
    }

    Ok(CacheStatus::Valid)
}

/// Deletes the cache marker so the cache is never trusted again.
pub fn invalidate(base: &Path) {
    let marker = marker_path(base);
    if let Err(e) = fs::remove_file(&marker)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to delete the existing {}: {e}", marker.display());
    }
}

/// Reads `name<TAB>length` lines, creating chromosomes and setting their lengths.
pub fn read_chr_list(path: &Path, genome: &mut Genome) -> Result<(), Error> {
    let reader = BufReader::new(File::open(path)?);
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(name), Some(length)) = (fields.next(), fields.next()) else {
            return Err(Error::Parse(format!(
                "{} line {}: expected name and length: '{line}'",
                path.display(),
                line_num + 1
            )));
        };
        let length: u32 = length.trim().parse().map_err(|e| {
            Error::Parse(format!(
                "{} line {}: invalid length '{length}': {e}",
                path.display(),
                line_num + 1
            ))
        })?;
        let index = genome.add_chromosome(name);
        if let Some(chromosome) = genome.chromosome_mut(index) {
            chromosome.set_length(length);
        }
    }
    Ok(())
}

/// Applies `alias<TAB>canonical[<TAB>offset]` lines to the genome's name
/// resolver. Lines with fewer than two fields are skipped. Re-applying a file
/// replaces the same aliases.
pub fn read_aliases(path: &Path, genome: &mut Genome) -> Result<(), Error> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            continue;
        }
        let offset = match fields.get(2) {
            Some(offset) => offset.trim().parse::<i64>().map_err(|e| {
                Error::Parse(format!("invalid alias offset '{offset}' in '{line}': {e}"))
            })?,
            None => 0,
        };
        genome.add_alias(fields[0], fields[1], offset)?;
    }
    Ok(())
}

/// `*.cache` files in `dir`, sorted by name.
fn cache_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|n| n.to_string_lossy().to_lowercase().ends_with(CACHE_EXTENSION))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Rebuilds a genome's chromosomes and core annotation set from its cache.
///
/// Cache files are registered without being read. Names that do not decode
/// to a (chromosome, type) pair are reported as warnings and skipped.
pub fn reload(base: &Path, genome: &mut Genome, ctx: ParseContext<'_>) -> Result<AnnotationSet, Error> {
    let dir = cache_dir(base);
    read_chr_list(&dir.join(CHR_LIST), genome)?;

    let cache_files = cache_files(&dir)?;

    let mut core = AnnotationSet::new(CORE_ANNOTATION_NAME);
    for (i, path) in cache_files.iter().enumerate() {
        ctx.check_cancelled()?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some((chromosome, feature_type)) = decode_cache_file_name(&file_name) else {
            ctx.warn(Error::Format(format!(
                "Cache name '{file_name}' didn't split into chr and type"
            )));
            continue;
        };
        if i % 100 == 0 {
            ctx.progress("Reloading cache files", i, cache_files.len());
        }
        let count = match FeatureCacheReader::read_file_summary(path) {
            Ok(summary) => Some(summary.feature_count),
            Err(e) => {
                ctx.warn(Error::Format(format!("Cache file {file_name} is unreadable: {e}")));
                None
            }
        };
        core.add_cached_file(&chromosome, &feature_type, path, count);
    }

    info!(
        "Reloaded {} cache files for {} {}",
        cache_files.len(),
        genome.species(),
        genome.assembly()
    );
    Ok(core)
}

/// Replaces any earlier cache files with the in-memory features of `set`,
/// then writes the chromosome list and finally the marker. Written pairs are switched to load from their cache file.
pub fn persist(base: &Path, genome: &Genome, set: &mut AnnotationSet, version: &str) -> Result<(), Error> {
    let dir = cache_dir(base);
    fs::create_dir_all(&dir)?;
    for stale in cache_files(&dir)? {
        fs::remove_file(&stale)?;
    }

    let mut written = Vec::new();
    for (chromosome, feature_type, features) in set.in_memory() {
        let path = dir.join(encode_cache_file_name(chromosome, feature_type)?);
        FeatureCacheWriter::write_file(&path, chromosome, feature_type, features)?;
        written.push((chromosome.to_string(), feature_type.to_string(), path));
    }
    for (chromosome, feature_type, path) in &written {
        set.mark_cached(chromosome, feature_type, path);
    }

    let mut chr_list = BufWriter::new(File::create(dir.join(CHR_LIST))?);
    for chromosome in genome.chromosomes() {
        writeln!(chr_list, "{}\t{}", chromosome.name(), chromosome.length())?;
    }
    chr_list.flush()?;

    let mut marker = File::create(dir.join(COMPLETE_MARKER))?;
    writeln!(marker, "{version}")?;
    marker.sync_all()?;

    info!(
        "Cached {} feature files for {} {}",
        written.len(),
        genome.species(),
        genome.assembly()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureBuilder;
    use crate::location::Location;
    use crate::progress::CancelToken;
    use crate::progress::tests::RecordingSink;
    use crate::strand::Strand;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn genome_dir() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("Danio_rerio").join("GRCz11");
        fs::create_dir_all(&base).unwrap();
        (dir, base)
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn write_marker(base: &Path, contents: &str) {
        fs::create_dir_all(cache_dir(base)).unwrap();
        fs::write(marker_path(base), contents).unwrap();
    }

    #[test]
    fn source_kinds() {
        assert_eq!(source_kind("1.dat"), Some(SourceKind::Embl));
        assert_eq!(source_kind("X.DAT.GZ"), Some(SourceKind::Embl));
        assert_eq!(source_kind("genes.gff3.gz"), Some(SourceKind::Gff));
        assert_eq!(source_kind("genes.GTF"), Some(SourceKind::Gff));
        assert_eq!(source_kind("aliases.txt"), None);
        assert_eq!(source_kind("readme.gz"), None);
    }

    #[test]
    fn missing_marker() {
        let (_dir, base) = genome_dir();
        assert_eq!(check_cache(&base, "1.0").unwrap(), CacheStatus::Missing);
    }

    #[test]
    fn marker_version_checks() {
        let (_dir, base) = genome_dir();
        write_marker(&base, "\n");
        assert_eq!(
            check_cache(&base, "1.0").unwrap(),
            CacheStatus::Invalid(InvalidReason::EmptyVersion)
        );

        write_marker(&base, "0.9\n");
        assert!(matches!(
            check_cache(&base, "1.0").unwrap(),
            CacheStatus::Invalid(InvalidReason::VersionMismatch { .. })
        ));

        write_marker(&base, "1.0\n");
        assert_eq!(check_cache(&base, "1.0").unwrap(), CacheStatus::Valid);
    }

    #[test]
    fn newer_source_invalidates() {
        let (_dir, base) = genome_dir();
        let source = base.join("1.dat");
        fs::write(&source, "").unwrap();
        write_marker(&base, "1.0\n");
        let now = SystemTime::now();
        set_mtime(&source, now - Duration::from_secs(3600));
        set_mtime(&marker_path(&base), now - Duration::from_secs(60));
        assert_eq!(check_cache(&base, "1.0").unwrap(), CacheStatus::Valid);

        set_mtime(&source, now);
        assert_eq!(
            check_cache(&base, "1.0").unwrap(),
            CacheStatus::Invalid(InvalidReason::SourceNewer(source))
        );

        invalidate(&base);
        assert!(!marker_path(&base).exists());
        invalidate(&base);
    }

    #[test]
    fn chr_list_and_aliases() {
        let (_dir, base) = genome_dir();
        let mut genome = Genome::new(&base).unwrap();
        fs::write(base.join(CHR_LIST), "1\t1000\n2\t500\n\n").unwrap();
        fs::write(base.join(ALIASES), "I\t1\nII\t2\t100\nlonely\n").unwrap();

        read_chr_list(&base.join(CHR_LIST), &mut genome).unwrap();
        read_aliases(&base.join(ALIASES), &mut genome).unwrap();
        read_aliases(&base.join(ALIASES), &mut genome).unwrap();

        assert_eq!(genome.chromosome_count(), 2);
        assert_eq!(genome.alias_count(), 2);
        assert_eq!(genome.resolve("II").unwrap().offset, 100);
    }

    #[test]
    fn bad_chr_list_is_fatal() {
        let (_dir, base) = genome_dir();
        let mut genome = Genome::new(&base).unwrap();
        fs::write(base.join(CHR_LIST), "1\tlong\n").unwrap();
        assert!(read_chr_list(&base.join(CHR_LIST), &mut genome).is_err());
        assert!(read_chr_list(&base.join("absent"), &mut genome).is_err());
    }

    #[test]
    fn alias_to_unknown_chromosome_is_fatal() {
        let (_dir, base) = genome_dir();
        let mut genome = Genome::new(&base).unwrap();
        fs::write(base.join(ALIASES), "I\t1\n").unwrap();
        assert!(read_aliases(&base.join(ALIASES), &mut genome).is_err());
    }

    #[test]
    fn persist_then_reload() {
        let (_dir, base) = genome_dir();
        let mut genome = Genome::new(&base).unwrap();
        for (name, length) in [("10", 5000), ("2", 3000)] {
            let index = genome.add_chromosome(name);
            genome.chromosome_mut(index).unwrap().set_length(length);
        }

        let mut set = AnnotationSet::new(CORE_ANNOTATION_NAME);
        for (chromosome, feature_type, start) in [("2", "gene", 10), ("2", "gene", 50), ("10", "mRNA", 7)] {
            let mut builder = FeatureBuilder::new(feature_type, chromosome);
            builder.add_attribute("ID", Some("x"));
            builder
                .set_location(Location::simple(start, start + 5, Strand::Forward))
                .unwrap();
            set.add_feature(builder.build().unwrap()).unwrap();
        }

        persist(&base, &genome, &mut set, "1.0").unwrap();
        assert_eq!(set.in_memory().count(), 0);
        assert_eq!(set.features_for_type("2", "gene").unwrap().len(), 2);
        assert_eq!(
            fs::read_to_string(cache_dir(&base).join(CHR_LIST)).unwrap(),
            "2\t3000\n10\t5000\n"
        );
        assert_eq!(fs::read_to_string(marker_path(&base)).unwrap(), "1.0\n");
        assert_eq!(check_cache(&base, "1.0").unwrap(), CacheStatus::Valid);

        fs::write(cache_dir(&base).join("nonsense.cache"), "").unwrap();
        let mut reloaded = Genome::new(&base).unwrap();
        let sink = RecordingSink::default();
        let cancel = CancelToken::new();
        let core = reload(&base, &mut reloaded, ParseContext::new(&sink, &cancel)).unwrap();

        assert_eq!(reloaded.chromosome_count(), 2);
        assert_eq!(reloaded.exact_chromosome("10").unwrap().length(), 5000);
        assert_eq!(core.len(), 3);
        assert_eq!(core.features_for_type("10", "mRNA").unwrap().len(), 1);
        assert_eq!(sink.warning_count(), 1);
    }

    #[test]
    fn corrupt_pair_file_warns_on_reload() {
        let (_dir, base) = genome_dir();
        let mut genome = Genome::new(&base).unwrap();
        genome.add_chromosome("1");
        persist(&base, &genome, &mut AnnotationSet::new(CORE_ANNOTATION_NAME), "1.0").unwrap();
        fs::write(cache_dir(&base).join("1%gene.cache"), b"not a cache file").unwrap();

        let mut reloaded = Genome::new(&base).unwrap();
        let sink = RecordingSink::default();
        let cancel = CancelToken::new();
        let core = reload(&base, &mut reloaded, ParseContext::new(&sink, &cancel)).unwrap();

        assert_eq!(core.feature_types().into_iter().collect::<Vec<_>>(), vec!["gene"]);
        assert_eq!(core.len(), 0);
        assert_eq!(sink.warning_count(), 1);
    }

    #[test]
    fn persist_replaces_stale_pair_files() {
        let (_dir, base) = genome_dir();
        fs::create_dir_all(cache_dir(&base)).unwrap();
        let stale = cache_dir(&base).join("X%gene.cache");
        fs::write(&stale, "left over").unwrap();

        let genome = Genome::new(&base).unwrap();
        let mut set = AnnotationSet::new(CORE_ANNOTATION_NAME);
        persist(&base, &genome, &mut set, "1.0").unwrap();

        assert!(!stale.exists());
        assert!(marker_path(&base).exists());
    }
}
