//! File names of per-(chromosome, feature type) cache entries.
//!
//! An entry for chromosome `chr` and type `type` lives in `<chr>%<type>.cache`.
//! Decoding splits at the first `%`, so a chromosome name may never contain
//! one while a feature type may.

use crate::error::Error;

pub const CACHE_EXTENSION: &str = ".cache";
const SEPARATOR: char = '%';

pub fn encode_cache_file_name(chromosome: &str, feature_type: &str) -> Result<String, Error> {
    if chromosome.is_empty() || feature_type.is_empty() {
        return Err(Error::Validation(format!(
            "cache key needs a chromosome and a feature type, got '{chromosome}' and '{feature_type}'"
        )));
    }
    if chromosome.contains(SEPARATOR) {
        return Err(Error::Validation(format!(
            "chromosome name '{chromosome}' contains '{SEPARATOR}'"
        )));
    }
    if [chromosome, feature_type]
        .iter()
        .any(|part| part.contains(['/', '\\']))
    {
        return Err(Error::Validation(format!(
            "cache key '{chromosome}{SEPARATOR}{feature_type}' contains a path separator"
        )));
    }
    Ok(format!("{chromosome}{SEPARATOR}{feature_type}{CACHE_EXTENSION}"))
}

/// Returns (chromosome, feature type) for a cache file name, or `None` if the
/// name does not follow the convention.
#[must_use]
pub fn decode_cache_file_name(file_name: &str) -> Option<(String, String)> {
    let stem = file_name.strip_suffix(CACHE_EXTENSION)?;
    let (chromosome, feature_type) = stem.split_once(SEPARATOR)?;
    if chromosome.is_empty() || feature_type.is_empty() {
        return None;
    }
    Some((chromosome.to_string(), feature_type.to_string()))
}
