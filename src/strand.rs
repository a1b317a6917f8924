//! Strand orientation for genomic features.

use std::fmt;

use crate::error::Error;

/// Strand orientation of a genomic feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Strand {
    Unknown = 0,
    Forward = 1,
    Reverse = 2,
}

impl Strand {
    /// Parse from GFF column 7. "+" is forward, "-" is reverse; anything else is unknown.
    #[must_use]
    pub fn from_gff(s: &str) -> Self {
        match s {
            "+" => Self::Forward,
            "-" => Self::Reverse,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Strand {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Forward),
            2 => Ok(Self::Reverse),
            _ => Err(Error::Parse(format!("invalid strand byte: {value}"))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
            Self::Unknown => write!(f, "."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_gff() {
        assert_eq!(Strand::from_gff("+"), Strand::Forward);
        assert_eq!(Strand::from_gff("-"), Strand::Reverse);
        assert_eq!(Strand::from_gff("."), Strand::Unknown);
        assert_eq!(Strand::from_gff("?"), Strand::Unknown);
    }

    #[test]
    fn byte_codes() {
        assert_eq!(Strand::Unknown.to_byte(), 0);
        assert_eq!(Strand::try_from(2).unwrap(), Strand::Reverse);
    }

    #[test]
    fn invalid_byte() {
        assert!(Strand::try_from(3).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Strand::Reverse.to_string(), "-");
        assert_eq!(Strand::Unknown.to_string(), ".");
    }
}
