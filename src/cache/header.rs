//! Header shared by every feature cache file.

use std::io::{Read, Write};

use crate::cache::binary_io::{BinaryRead, BinaryWrite};
use crate::error::Error;

/// Cache file signature: 0x89 'G' 'I' 'C' 0x0D 0x0A 0x1A 0x0A
pub const CACHE_SIGNATURE: u64 = 0x0A1A_0A0D_4349_4789;

/// File type identifier for per-(chromosome, type) feature files.
pub const FEATURE_CACHE_FILE_TYPE: u16 = 1;

/// Current format version for feature cache files.
pub const FEATURE_CACHE_FORMAT_VERSION: u16 = 1;

pub fn write_common_header<W: Write>(
    writer: &mut W,
    file_type: u16,
    format_version: u16,
) -> Result<(), Error> {
    writer.write_u64(CACHE_SIGNATURE)?;
    writer.write_u16(file_type)?;
    writer.write_u16(format_version)?;
    Ok(())
}

/// Reads the common header and checks it describes a feature cache file of
/// the current format version.
pub fn read_feature_header<R: Read>(reader: &mut R) -> Result<(), Error> {
    let signature = reader.read_u64()?;
    if signature != CACHE_SIGNATURE {
        return Err(Error::Format(format!(
            "invalid cache file signature: expected {CACHE_SIGNATURE:#x}, got {signature:#x}"
        )));
    }

    let file_type = reader.read_u16()?;
    if file_type != FEATURE_CACHE_FILE_TYPE {
        return Err(Error::Format(format!(
            "unexpected file type: expected {FEATURE_CACHE_FILE_TYPE}, got {file_type}"
        )));
    }

    let format_version = reader.read_u16()?;
    if format_version != FEATURE_CACHE_FORMAT_VERSION {
        return Err(Error::Format(format!(
            "unexpected format version: expected {FEATURE_CACHE_FORMAT_VERSION}, got {format_version}"
        )));
    }

    Ok(())
}
