//! Writer for feature cache files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cache::binary_io::BinaryWrite;
use crate::cache::header::{
    FEATURE_CACHE_FILE_TYPE, FEATURE_CACHE_FORMAT_VERSION, write_common_header,
};
use crate::error::Error;
use crate::feature::Feature;
use crate::location::Location;

pub(crate) const LOCATION_SIMPLE: u8 = 0;
pub(crate) const LOCATION_SPLIT: u8 = 1;

const COMPRESSION_LEVEL: i32 = 3;

/// Writes the features of one (chromosome, type) pair.
///
/// Layout: common header, chromosome, feature type, u32 feature count, u32
/// compressed length, then the zstd-compressed feature records.
pub struct FeatureCacheWriter;

impl FeatureCacheWriter {
    pub fn write<W: Write>(
        writer: &mut W,
        chromosome: &str,
        feature_type: &str,
        features: &[Feature],
    ) -> Result<(), Error> {
        let body = Self::encode_features(features)?;
        let compressed = zstd::encode_all(body.as_slice(), COMPRESSION_LEVEL)?;

        write_common_header(writer, FEATURE_CACHE_FILE_TYPE, FEATURE_CACHE_FORMAT_VERSION)?;
        writer.write_string(chromosome)?;
        writer.write_string(feature_type)?;
        writer.write_len(features.len(), "feature count")?;
        writer.write_len(compressed.len(), "compressed buffer size")?;
        writer.write_all(&compressed)?;
        Ok(())
    }

    pub fn write_file(
        path: &Path,
        chromosome: &str,
        feature_type: &str,
        features: &[Feature],
    ) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write(&mut writer, chromosome, feature_type, features)?;
        writer.flush()?;
        Ok(())
    }

    fn encode_features(features: &[Feature]) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        for feature in features {
            Self::write_location(&mut body, feature.location())?;
            let attributes = feature.attributes();
            body.write_len(attributes.len(), "attribute count")?;
            for (key, value) in attributes.iter() {
                body.write_string(key)?;
                body.write_optional_string(value)?;
            }
        }
        Ok(body)
    }

    fn write_location<W: Write>(writer: &mut W, location: &Location) -> Result<(), Error> {
        match location {
            Location::Simple(_) => writer.write_u8(LOCATION_SIMPLE)?,
            Location::Split(parts) => {
                writer.write_u8(LOCATION_SPLIT)?;
                writer.write_len(parts.len(), "sublocation count")?;
            }
        }
        for interval in location.sublocations() {
            writer.write_u32(interval.start())?;
            writer.write_u32(interval.end())?;
            writer.write_u8(interval.strand().to_byte())?;
        }
        Ok(())
    }
}
