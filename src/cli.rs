//! Console output helpers for the cache builder.

use std::time::{Duration, Instant};

use colored::Colorize;

use crate::genome::Genome;

pub fn banner(subtitle: &str) {
    eprintln!();
    eprintln!("{} {}", "genome-ingest".bold().cyan(), subtitle.dimmed());
    eprintln!("{}", format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    eprintln!();
}

pub fn section(title: &str) {
    let bar = "─".repeat(50);
    eprintln!("{} {}", title.bold().blue(), bar.dimmed());
}

pub fn kv(key: &str, value: &str) {
    eprintln!("  {:<20} {}", key.dimmed(), value);
}

pub fn success(msg: &str) {
    eprintln!("  {} {}", "✓".green().bold(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("  {} {}", "⚠".yellow(), msg.yellow());
}

pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red().bold(), msg.red());
}

/// Progress line, rewritten in place.
pub fn progress(message: &str, current: usize, total: usize) {
    if total > 0 {
        eprint!("\r  {} {message} ({current}/{total})\x1b[K", "…".dimmed());
    } else {
        eprint!("\r  {} {message}\x1b[K", "…".dimmed());
    }
}

pub fn end_progress() {
    eprintln!();
}

pub fn genome_summary(genome: &Genome) {
    let annotations = genome.annotations();
    kv("Genome", &format!("{} {}", genome.species(), genome.assembly()));
    kv("Chromosomes", &genome.chromosome_count().to_string());
    kv("Total length", &format_count(genome.total_length()));
    if let Some(longest) = genome.longest_chromosome() {
        kv(
            "Longest",
            &format!("{} ({} bp)", longest.name(), format_count(u64::from(longest.length()))),
        );
    }
    kv("Feature types", &annotations.feature_types().len().to_string());
    kv("Features", &format_count(annotations.feature_count() as u64));

    let unloaded: Vec<&str> = genome.unloaded_feature_types().collect();
    if !unloaded.is_empty() {
        kv("Skipped types", &unloaded.join(", "));
    }
}

pub fn print_summary(start: Instant) {
    eprintln!();
    eprintln!("{}  {}", "Time".dimmed(), format_elapsed(start.elapsed()).bold());
    eprintln!();
}

/// Formats a duration as HH:MM:SS.d (tenths of a second).
#[must_use]
pub fn format_elapsed(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let tenths = d.subsec_millis() / 100;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{tenths}")
}

/// Groups digits in threes: `3100000` becomes `3,100,000`.
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
