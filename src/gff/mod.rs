//! GFF3/GTF reader: turns annotation lines into features, reassembling
//! spliced transcripts from their exon records.

pub mod grouping;
pub mod parser;

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::annotation::{AnnotationSet, DEFAULT_ANNOTATION_SET_SIZE};
use crate::error::Error;
use crate::feature::FeatureBuilder;
use crate::genome::Genome;
use crate::location::{Interval, Location};
use crate::progress::ParseContext;
use crate::text::{LossyLines, is_gzipped};

use grouping::{FeatureGrouper, GroupKey};
use parser::{AttributeTable, GffRecord, ParsedLine};

/// Settings for one GFF parse.
#[derive(Debug, Clone)]
pub struct GffOptions {
    /// Prepended to the type of every feature built.
    pub prefix: String,
    /// Lines read before the current set is finalised and a new one opened.
    pub annotation_set_size: usize,
    /// Lines between progress notifications.
    pub progress_interval: usize,
}

impl Default for GffOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            annotation_set_size: DEFAULT_ANNOTATION_SET_SIZE,
            progress_interval: 1000,
        }
    }
}

struct GffReader<'a> {
    name: &'a str,
    genome: &'a mut Genome,
    options: &'a GffOptions,
    ctx: ParseContext<'a>,
    sets: Vec<AnnotationSet>,
    grouper: FeatureGrouper,
}

impl GffReader<'_> {
    fn current(&mut self) -> Result<&mut AnnotationSet, Error> {
        self.sets
            .last_mut()
            .ok_or_else(|| Error::Validation("no open annotation set".to_string()))
    }

    fn rotate(&mut self) -> Result<(), Error> {
        self.current()?.finalise();
        let name = format!("{}[{}]", self.name, self.sets.len());
        self.sets.push(AnnotationSet::new(name));
        Ok(())
    }

    fn add_record(&mut self, record: &GffRecord) -> Result<(), Error> {
        let Some(target) = self.genome.resolve(&record.seqid) else {
            self.ctx.warn(Error::Validation(format!(
                "Couldn't find a chromosome called {}",
                record.seqid
            )));
            return Ok(());
        };
        let Some(chromosome) = self.genome.chromosome(target.index) else {
            return Err(Error::Validation(format!(
                "sequence {} resolved to a missing chromosome",
                record.seqid
            )));
        };
        let chromosome_name = chromosome.name().to_string();
        let length = i64::from(chromosome.length());

        let (Some(start), Some(end)) = (target.position(record.start), target.position(record.end))
        else {
            self.ctx.warn(Error::Validation(format!(
                "Location {}-{} on {chromosome_name} overflows when shifted by {}",
                record.start, record.end, target.offset
            )));
            return Ok(());
        };
        if end > length {
            self.ctx.warn(Error::Validation(format!(
                "Reading position {end} was {}bp beyond the end of chr{chromosome_name} ({length})",
                end - length
            )));
            return Ok(());
        }
        let (Ok(start), Ok(end)) = (u32::try_from(start), u32::try_from(end)) else {
            self.ctx.warn(Error::Validation(format!(
                "Location {start}-{end} on {chromosome_name} is out of range"
            )));
            return Ok(());
        };
        let interval = Interval::new(start, end, record.strand);

        for pair in &record.malformed_attributes {
            self.ctx.warn(Error::Parse(format!("No key value delimiter in '{pair}'")));
        }

        let attributes = &record.attributes;
        let prefix = self.options.prefix.as_str();
        let feature_type = record.feature_type.as_str();
        let group_type = if feature_type == "exon" { "mRNA" } else { feature_type };

        if feature_type != "mRNA"
            && let Some(parents) = attributes.first("Parent")
        {
            for parent in parents.split(',') {
                let builder = || new_builder(prefix, group_type, &chromosome_name, attributes);
                self.grouper
                    .add_sublocation(GroupKey::new(group_type, parent), interval, builder);
            }
        } else if let Some(transcript_id) = attributes.first("transcript_id") {
            let builder = || new_builder(prefix, group_type, &chromosome_name, attributes);
            self.grouper
                .add_sublocation(GroupKey::new(group_type, transcript_id), interval, builder);
        } else {
            let builder = new_builder(prefix, feature_type, &chromosome_name, attributes);
            let standalone = match attributes.first("ID") {
                Some(id) => self
                    .grouper
                    .register(GroupKey::new(feature_type, id), builder, interval),
                None => Some(builder),
            };
            if let Some(builder) = standalone {
                self.current()?
                    .add_feature(builder.build_with(Location::Simple(interval)))?;
            }
        }
        Ok(())
    }
}

fn new_builder(
    prefix: &str,
    feature_type: &str,
    chromosome: &str,
    attributes: &AttributeTable,
) -> FeatureBuilder {
    let mut builder = FeatureBuilder::new(format!("{prefix}{feature_type}"), chromosome);
    for (key, values) in attributes.iter() {
        for value in values {
            builder.add_attribute(key, Some(value));
        }
    }
    builder
}

/// Parse a gzip-compressed GFF3/GTF stream.
pub fn parse_gff_gz<R: Read>(
    reader: R,
    name: &str,
    genome: &mut Genome,
    options: &GffOptions,
    ctx: ParseContext<'_>,
) -> Result<Vec<AnnotationSet>, Error> {
    parse_gff(BufReader::new(GzDecoder::new(reader)), name, genome, options, ctx)
}

/// Parse a GFF3/GTF stream into annotation sets named after `name`.
///
/// Malformed records are skipped with a warning. Grouped features are added
/// to the last set once the whole stream has been read. On cancellation the
/// partially built sets are dropped and `Error::Cancelled` is returned.
pub fn parse_gff<R: BufRead>(
    reader: R,
    name: &str,
    genome: &mut Genome,
    options: &GffOptions,
    ctx: ParseContext<'_>,
) -> Result<Vec<AnnotationSet>, Error> {
    let mut gff = GffReader {
        name,
        genome,
        options,
        ctx,
        sets: vec![AnnotationSet::new(name)],
        grouper: FeatureGrouper::new(),
    };
    let set_size = options.annotation_set_size.max(1);
    let progress_interval = options.progress_interval.max(1);

    for (count, line) in LossyLines::new(reader).enumerate() {
        ctx.check_cancelled()?;

        if count % progress_interval == 0 {
            ctx.progress(&format!("Read {count} lines from {name}"), count, 0);
        }
        if count > 0 && count % set_size == 0 {
            gff.rotate()?;
        }

        match parser::parse_line(&line?) {
            Ok(ParsedLine::Record(record)) => gff.add_record(&record)?,
            Ok(ParsedLine::Comment) => {}
            Err(warning) => ctx.warn(warning),
        }
    }

    if !gff.grouper.is_empty() {
        let grouped = std::mem::take(&mut gff.grouper).finish()?;
        let current = gff.current()?;
        for feature in grouped {
            current.add_feature(feature)?;
        }
    }

    Ok(gff.sets)
}

/// Parse a GFF3/GTF file, decompressing it when the name ends in `.gz`.
pub fn parse_gff_file(
    path: &Path,
    genome: &mut Genome,
    options: &GffOptions,
    ctx: ParseContext<'_>,
) -> Result<Vec<AnnotationSet>, Error> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = File::open(path)?;
    if is_gzipped(path) {
        parse_gff_gz(file, &name, genome, options, ctx)
    } else {
        parse_gff(BufReader::new(file), &name, genome, options, ctx)
    }
}
