//! EMBL flat-file feature-table reader.
//!
//! A physical file may hold several concatenated entries. Each entry names a
//! chromosome and the position of its sequence on that chromosome in the `AC`
//! line; feature coordinates are shifted by that position so that several
//! entries can contribute to one chromosome.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use log::debug;

use crate::annotation::AnnotationSet;
use crate::error::Error;
use crate::feature::FeatureBuilder;
use crate::genome::Genome;
use crate::location::Location;
use crate::progress::ParseContext;
use crate::text::{LossyLines, is_gzipped};

/// Data lines shorter than this carry no feature content.
const MIN_FEATURE_LINE: usize = 18;
const TYPE_COLUMNS: std::ops::Range<usize> = 5..18;
const DATA_COLUMN: usize = 21;

/// One entry read from an EMBL stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmblEntry {
    pub chromosome_index: usize,
    pub chromosome_name: String,
    /// Added to every coordinate in the entry's feature table.
    pub offset: i64,
}

/// The feature currently being assembled inside a feature table.
#[derive(Debug)]
enum Pending {
    /// Not building anything; continuation lines are ignored.
    Idle,
    Building {
        builder: FeatureBuilder,
        attribute: String,
    },
}

#[derive(Debug)]
enum State {
    SeekingAccession,
    SeekingFeatureTable(EmblEntry),
    InFeatureTable(EmblEntry, Pending),
    SkippingEntry,
}

/// What completing an attribute means for the feature that owns it.
enum Completion {
    Keep,
    Abandon,
}

/// Line-at-a-time EMBL reader. All per-entry state lives in [`State`], which
/// is threaded through [`EmblReader::step`].
struct EmblReader<'a> {
    genome: &'a mut Genome,
    annotation: &'a mut AnnotationSet,
    include: &'a dyn Fn(&str) -> bool,
    ctx: ParseContext<'a>,
    entries: Vec<EmblEntry>,
}

impl EmblReader<'_> {
    fn step(&mut self, state: State, line: &str) -> Result<State, Error> {
        match state {
            State::SeekingAccession => self.seek_accession(line),
            State::SkippingEntry => Ok(if line.starts_with("//") {
                State::SeekingAccession
            } else {
                State::SkippingEntry
            }),
            State::SeekingFeatureTable(entry) => Ok(if line.starts_with("FH") {
                State::InFeatureTable(entry, Pending::Idle)
            } else if line.starts_with("SQ") {
                // Sequence data and no feature table.
                State::SkippingEntry
            } else if line.starts_with("//") {
                State::SeekingAccession
            } else {
                State::SeekingFeatureTable(entry)
            }),
            State::InFeatureTable(entry, pending) => self.feature_line(entry, pending, line),
        }
    }

    fn seek_accession(&mut self, line: &str) -> Result<State, Error> {
        if line.starts_with("//") {
            return Err(Error::Parse(
                "reached the end of an entry before finding its AC line".to_string(),
            ));
        }
        if !line.starts_with("AC") {
            return Ok(State::SeekingAccession);
        }

        let sections: Vec<&str> = line.split(':').collect();
        if sections.len() != 6 {
            self.ctx.warn(Error::Parse(format!(
                "AC line didn't have 6 sections '{line}'"
            )));
            return Ok(State::SkippingEntry);
        }
        if line.contains("supercontig") {
            debug!("skipping supercontig entry '{line}'");
            return Ok(State::SkippingEntry);
        }

        let (Ok(start), Ok(length)) = (
            sections[3].trim().parse::<i64>(),
            sections[4].trim().parse::<u32>(),
        ) else {
            self.ctx.warn(Error::Parse(format!(
                "AC line has non-numeric coordinates '{line}'"
            )));
            return Ok(State::SkippingEntry);
        };
        let Some(offset) = start.checked_sub(1).filter(|offset| u32::try_from(*offset).is_ok()) else {
            self.ctx.warn(Error::Parse(format!(
                "AC line start {start} is out of range '{line}'"
            )));
            return Ok(State::SkippingEntry);
        };

        let chromosome_index = self.genome.add_chromosome(sections[2].trim());
        let chromosome = self
            .genome
            .chromosome_mut(chromosome_index)
            .ok_or_else(|| Error::Validation(format!("chromosome {chromosome_index} vanished")))?;
        chromosome.set_length(length);

        let entry = EmblEntry {
            chromosome_index,
            chromosome_name: chromosome.name().to_string(),
            offset,
        };
        self.entries.push(entry.clone());
        Ok(State::SeekingFeatureTable(entry))
    }

    fn feature_line(
        &mut self,
        entry: EmblEntry,
        pending: Pending,
        line: &str,
    ) -> Result<State, Error> {
        if line.starts_with("XX") || line.starts_with("SQ") || line.starts_with("//") {
            self.complete_feature(pending, entry.offset)?;
            return Ok(if line.starts_with("//") {
                State::SeekingAccession
            } else {
                State::SkippingEntry
            });
        }

        if line.len() < MIN_FEATURE_LINE || line.starts_with("FH") {
            return Ok(State::InFeatureTable(entry, pending));
        }

        let feature_type = line.get(TYPE_COLUMNS).unwrap_or("").trim();
        let data = line.get(DATA_COLUMN..).unwrap_or("").trim();

        if !feature_type.is_empty() {
            self.complete_feature(pending, entry.offset)?;
            let pending = if (self.include)(feature_type) {
                Pending::Building {
                    builder: FeatureBuilder::new(feature_type, entry.chromosome_name.as_str()),
                    attribute: format!("location={data}"),
                }
            } else {
                self.genome.add_unloaded_feature_type(feature_type);
                Pending::Idle
            };
            return Ok(State::InFeatureTable(entry, pending));
        }

        let Pending::Building {
            mut builder,
            mut attribute,
        } = pending
        else {
            return Ok(State::InFeatureTable(entry, Pending::Idle));
        };

        if data.starts_with('/') {
            if let Completion::Abandon = self.complete_attribute(&mut builder, &attribute, entry.offset) {
                return Ok(State::InFeatureTable(entry, Pending::Idle));
            }
            attribute.clear();
        } else if attribute.contains("description=") {
            attribute.push(' ');
        }
        attribute.push_str(data);

        Ok(State::InFeatureTable(
            entry,
            Pending::Building { builder, attribute },
        ))
    }

    fn complete_attribute(
        &self,
        builder: &mut FeatureBuilder,
        attribute: &str,
        offset: i64,
    ) -> Completion {
        let (key, value) = match attribute.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (attribute, None),
        };

        if key != "location" {
            builder.add_attribute(key, value);
            return Completion::Keep;
        }

        let Some(value) = value else {
            self.ctx.warn(Error::Parse(format!(
                "location for {} feature didn't have an '=' delimiter",
                builder.feature_type()
            )));
            return Completion::Abandon;
        };

        if value.contains(':') {
            self.ctx.warn(Error::Parse(format!(
                "{} feature location '{value}' refers to another sequence",
                builder.feature_type()
            )));
            return Completion::Abandon;
        }

        match Location::parse_embl(value, offset).and_then(|location| builder.set_location(location)) {
            Ok(()) => Completion::Keep,
            Err(e) => {
                self.ctx.warn(e);
                Completion::Abandon
            }
        }
    }

    fn complete_feature(&mut self, pending: Pending, offset: i64) -> Result<(), Error> {
        let Pending::Building {
            mut builder,
            attribute,
        } = pending
        else {
            return Ok(());
        };

        if let Completion::Abandon = self.complete_attribute(&mut builder, &attribute, offset) {
            return Ok(());
        }

        let feature_type = builder.feature_type().to_string();
        match builder.build() {
            Some(feature) => self.annotation.add_feature(feature),
            None => {
                debug!("dropping {feature_type} feature without a location");
                Ok(())
            }
        }
    }

    fn finish(&mut self, state: State) -> Result<(), Error> {
        if let State::InFeatureTable(entry, pending) = state {
            self.complete_feature(pending, entry.offset)?;
        }
        Ok(())
    }
}

/// Parse a gzip-compressed EMBL stream.
pub fn parse_embl_gz<R: Read>(
    reader: R,
    genome: &mut Genome,
    annotation: &mut AnnotationSet,
    include: &dyn Fn(&str) -> bool,
    ctx: ParseContext<'_>,
) -> Result<Vec<EmblEntry>, Error> {
    parse_embl(
        BufReader::new(GzDecoder::new(reader)),
        genome,
        annotation,
        include,
        ctx,
    )
}

/// Parse every entry of an EMBL stream, adding the features whose type passes
/// `include` to `annotation`.
///
/// Malformed `AC` lines skip their entry with a warning. An end-of-entry
/// marker before any `AC` line and I/O errors abort the parse.
pub fn parse_embl<R: BufRead>(
    reader: R,
    genome: &mut Genome,
    annotation: &mut AnnotationSet,
    include: &dyn Fn(&str) -> bool,
    ctx: ParseContext<'_>,
) -> Result<Vec<EmblEntry>, Error> {
    let mut embl = EmblReader {
        genome,
        annotation,
        include,
        ctx,
        entries: Vec::new(),
    };

    let mut state = State::SeekingAccession;
    for line in LossyLines::new(reader) {
        ctx.check_cancelled()?;
        state = embl.step(state, &line?)?;
    }
    embl.finish(state)?;

    Ok(embl.entries)
}

/// Parse an EMBL file, decompressing it when the name ends in `.gz`.
pub fn parse_embl_file(
    path: &Path,
    genome: &mut Genome,
    annotation: &mut AnnotationSet,
    include: &dyn Fn(&str) -> bool,
    ctx: ParseContext<'_>,
) -> Result<Vec<EmblEntry>, Error> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        parse_embl_gz(file, genome, annotation, include, ctx)
    } else {
        parse_embl(BufReader::new(file), genome, annotation, include, ctx)
    }
}
