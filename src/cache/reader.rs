//! Reader for feature cache files.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::cache::binary_io::BinaryRead;
use crate::cache::header::read_feature_header;
use crate::cache::writer::{LOCATION_SIMPLE, LOCATION_SPLIT};
use crate::error::Error;
use crate::feature::{Attributes, Feature};
use crate::location::{Interval, Location};
use crate::strand::Strand;

/// Upper bound on speculative allocation from counts read off disk.
const MAX_PREALLOCATED: usize = 1 << 16;

/// Contents of one cache file.
#[derive(Debug)]
pub struct CachedFeatures {
    pub chromosome: String,
    pub feature_type: String,
    pub features: Vec<Feature>,
}

/// Header fields of a cache file, readable without decompressing the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSummary {
    pub chromosome: String,
    pub feature_type: String,
    pub feature_count: usize,
}

pub struct FeatureCacheReader;

impl FeatureCacheReader {
    pub fn read_summary<R: Read>(reader: &mut R) -> Result<CacheSummary, Error> {
        read_feature_header(reader)?;
        let chromosome = reader.read_string()?;
        let feature_type = reader.read_string()?;
        let feature_count = reader.read_u32()? as usize;
        Ok(CacheSummary {
            chromosome,
            feature_type,
            feature_count,
        })
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<CachedFeatures, Error> {
        let summary = Self::read_summary(reader)?;
        let compressed_len = reader.read_u32()? as usize;
        let mut compressed = Vec::new();
        Read::take(&mut *reader, compressed_len as u64).read_to_end(&mut compressed)?;
        if compressed.len() != compressed_len {
            return Err(Error::Format(format!(
                "truncated cache file: expected {compressed_len} compressed bytes, got {}",
                compressed.len()
            )));
        }

        let body = zstd::decode_all(compressed.as_slice())?;
        let mut cursor = Cursor::new(body.as_slice());
        let mut features = Vec::with_capacity(summary.feature_count.min(MAX_PREALLOCATED));
        for _ in 0..summary.feature_count {
            let location = Self::read_location(&mut cursor)?;
            let attributes = Self::read_attributes(&mut cursor)?;
            features.push(Feature::new(
                summary.feature_type.as_str(),
                summary.chromosome.as_str(),
                location,
                attributes,
            ));
        }
        if cursor.position() as usize != body.len() {
            return Err(Error::Format(format!(
                "{} unread bytes after {} features",
                body.len() - cursor.position() as usize,
                summary.feature_count
            )));
        }

        Ok(CachedFeatures {
            chromosome: summary.chromosome,
            feature_type: summary.feature_type,
            features,
        })
    }

    pub fn read_file(path: &Path) -> Result<CachedFeatures, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader).map_err(|e| match e {
            Error::Io(io) => Error::Format(format!("cannot read {}: {io}", path.display())),
            other => other,
        })
    }

    pub fn read_file_summary(path: &Path) -> Result<CacheSummary, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_summary(&mut reader)
    }

    fn read_interval<R: Read>(reader: &mut R) -> Result<Interval, Error> {
        let start = reader.read_u32()?;
        let end = reader.read_u32()?;
        let strand = Strand::try_from(reader.read_u8()?)?;
        Ok(Interval::new(start, end, strand))
    }

    fn read_location<R: Read>(reader: &mut R) -> Result<Location, Error> {
        match reader.read_u8()? {
            LOCATION_SIMPLE => Ok(Location::Simple(Self::read_interval(reader)?)),
            LOCATION_SPLIT => {
                let count = reader.read_u32()? as usize;
                if count < 2 {
                    return Err(Error::Format(format!(
                        "split location with {count} sublocations"
                    )));
                }
                let mut parts = Vec::with_capacity(count.min(MAX_PREALLOCATED));
                for _ in 0..count {
                    parts.push(Self::read_interval(reader)?);
                }
                Location::from_parts(parts)
            }
            tag => Err(Error::Format(format!("invalid location tag: {tag}"))),
        }
    }

    fn read_attributes<R: Read>(reader: &mut R) -> Result<Attributes, Error> {
        let count = reader.read_u32()?;
        let mut attributes = Attributes::new();
        for _ in 0..count {
            let key = reader.read_string()?;
            let value = reader.read_optional_string()?;
            attributes.push_raw(key, value);
        }
        Ok(attributes)
    }
}
