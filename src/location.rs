//! Genomic intervals and spliced (multi-part) locations.

use std::fmt;

use crate::error::Error;
use crate::strand::Strand;

/// A closed genomic interval on one strand. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    start: u32,
    end: u32,
    strand: Strand,
}

impl Interval {
    /// Builds an interval from raw coordinates, swapping them if needed.
    #[must_use]
    pub fn new(start: u32, end: u32, strand: Strand) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
                strand,
            }
        } else {
            Self { start, end, strand }
        }
    }

    #[must_use]
    pub fn start(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    #[must_use]
    pub fn strand(&self) -> Strand {
        self.strand
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }

    #[must_use]
    pub fn middle(&self) -> u32 {
        self.start + (self.end - self.start) / 2
    }
}

/// Location of a feature: a single interval or the ordered parts of a spliced feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Simple(Interval),
    /// Always holds at least two parts, sorted by (start, end, strand).
    Split(Vec<Interval>),
}

impl Location {
    #[must_use]
    pub fn simple(start: u32, end: u32, strand: Strand) -> Self {
        Self::Simple(Interval::new(start, end, strand))
    }

    /// Builds a location from sublocations. A single part collapses to `Simple`.
    pub fn from_parts(mut parts: Vec<Interval>) -> Result<Self, Error> {
        match parts.len() {
            0 => Err(Error::Validation(
                "a location needs at least one sublocation".to_string(),
            )),
            1 => Ok(Self::Simple(parts[0])),
            _ => {
                parts.sort();
                Ok(Self::Split(parts))
            }
        }
    }

    #[must_use]
    pub fn start(&self) -> u32 {
        match self {
            Self::Simple(interval) => interval.start,
            Self::Split(parts) => parts.iter().map(Interval::start).min().unwrap_or(0),
        }
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        match self {
            Self::Simple(interval) => interval.end,
            Self::Split(parts) => parts.iter().map(Interval::end).max().unwrap_or(0),
        }
    }

    #[must_use]
    pub fn strand(&self) -> Strand {
        match self {
            Self::Simple(interval) => interval.strand,
            Self::Split(parts) => parts.first().map_or(Strand::Unknown, Interval::strand),
        }
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        u64::from(self.end() - self.start()) + 1
    }

    #[must_use]
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split(_))
    }

    #[must_use]
    pub fn sublocations(&self) -> &[Interval] {
        match self {
            Self::Simple(interval) => std::slice::from_ref(interval),
            Self::Split(parts) => parts,
        }
    }

    /// Renders the location in EMBL feature-table syntax.
    #[must_use]
    pub fn to_embl_string(&self) -> String {
        let ranges: Vec<String> = self
            .sublocations()
            .iter()
            .map(|p| format!("{}..{}", p.start, p.end))
            .collect();
        let ranges = ranges.join(",");
        match self.strand() {
            Strand::Reverse => format!("complement({ranges})"),
            Strand::Unknown => format!("unknown({ranges})"),
            Strand::Forward => ranges,
        }
    }

    /// Parses an EMBL location such as `complement(join(10..20,30..>40))`,
    /// adding `offset` to every coordinate.
    ///
    /// The strand applies to the whole location: any `complement` makes it
    /// reverse, any `unknown` makes it unknown. Position ambiguity markers
    /// (`<`, `>`) are dropped and a lone position `N` reads as `N..N`.
    pub fn parse_embl(text: &str, offset: i64) -> Result<Self, Error> {
        let strand = if text.contains("complement") {
            Strand::Reverse
        } else if text.contains("unknown") {
            Strand::Unknown
        } else {
            Strand::Forward
        };

        let stripped = text
            .replace("join(", "")
            .replace("order(", "")
            .replace("complement(", "")
            .replace("unknown(", "")
            .replace([')', '<', '>'], "");

        let mut parts = Vec::new();
        for part in stripped.split(',') {
            let part = part.trim();
            let (first, second) = part.split_once("..").unwrap_or((part, part));
            let start = shift_position(first, offset, text)?;
            let end = shift_position(second, offset, text)?;
            parts.push(Interval::new(start, end, strand));
        }

        Self::from_parts(parts)
    }
}

fn shift_position(raw: &str, offset: i64, location: &str) -> Result<u32, Error> {
    let position: i64 = raw
        .trim()
        .parse()
        .map_err(|e| Error::Parse(format!("invalid position '{raw}' in location '{location}': {e}")))?;
    position
        .checked_add(offset)
        .and_then(|shifted| u32::try_from(shifted).ok())
        .ok_or_else(|| {
            Error::Parse(format!(
                "position {raw} shifted by {offset} is out of range in location '{location}'"
            ))
        })
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start(), self.end())
    }
}
