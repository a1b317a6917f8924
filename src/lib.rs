//! Genome annotation ingestion: EMBL and GFF3/GTF readers, feature grouping
//! and a per-genome annotation cache.

pub mod error;

pub mod annotation;
pub mod cache;
pub mod chromosome;
pub mod cli;
pub mod config;
pub mod embl;
pub mod feature;
pub mod genome;
pub mod gff;
pub mod loader;
pub mod location;
pub mod progress;
pub mod strand;
mod text;
