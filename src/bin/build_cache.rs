use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use colored::Colorize;

use genome_ingest::cli;
use genome_ingest::config::LoaderConfig;
use genome_ingest::genome::Genome;
use genome_ingest::loader::{GenomeLoader, LoaderOptions};
use genome_ingest::progress::{CancelToken, ChannelSink, LoadEvent, LogSink, ParseContext};

/// Warnings printed individually before only the total is reported.
const MAX_SHOWN_WARNINGS: usize = 20;

#[derive(Parser)]
#[command(
    name = "build_cache",
    about = "Parse genome annotation and build the annotation cache"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", conflicts_with = "genomes")]
    config: Option<PathBuf>,

    /// Genome directories (<species>/<assembly>)
    genomes: Vec<PathBuf>,

    /// Feature type to leave out of EMBL files (repeatable)
    #[arg(short = 'i', long = "ignore")]
    ignore: Vec<String>,

    /// Prefix added to GFF feature types
    #[arg(short = 'p', long = "prefix")]
    prefix: Option<String>,

    /// Report loading through the logger (RUST_LOG) instead of the console
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn resolve(cli_args: &Cli) -> Result<(Vec<PathBuf>, LoaderOptions)> {
    let (dirs, mut options) = match &cli_args.config {
        Some(path) => {
            let config = LoaderConfig::from_file(path)?;
            cli::kv("Config", &path.display().to_string());
            (config.genome_dirs(), config.to_options())
        }
        None if cli_args.genomes.is_empty() => {
            bail!("either --config or at least one genome directory is required")
        }
        None => (cli_args.genomes.clone(), LoaderOptions::default()),
    };

    options
        .ignored_feature_types
        .extend(cli_args.ignore.iter().map(|t| t.to_lowercase()));
    if let Some(prefix) = &cli_args.prefix {
        options.gff_prefix = prefix.clone();
    }
    Ok((dirs, options))
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let start = Instant::now();
    let cli_args = Cli::parse();

    cli::banner("Build Annotation Cache");

    // ── Configuration ────────────────────────────────────
    cli::section("Configuration");

    let (dirs, options) = resolve(&cli_args)?;
    for dir in &dirs {
        cli::kv("Genome", &dir.display().to_string());
    }
    cli::kv("Version", &options.version);
    if !options.ignored_feature_types.is_empty() {
        cli::kv("Ignored types", &options.ignored_feature_types.join(", "));
    }
    if !options.gff_prefix.is_empty() {
        cli::kv("GFF prefix", &options.gff_prefix);
    }

    eprintln!();

    // ── Loading ──────────────────────────────────────────
    cli::section("Loading");

    let loader = GenomeLoader::new(options);
    let genomes = if cli_args.quiet {
        let cancel = CancelToken::new();
        let genomes = loader.load(&dirs, ParseContext::new(&LogSink, &cancel))?;
        cli::success(&format!("loaded {} genome(s)", genomes.len()));
        genomes
    } else {
        load_with_console(loader, dirs)?
    };

    eprintln!();

    // ── Summary ──────────────────────────────────────────
    for genome in &genomes {
        cli::section(&genome.assembly().bold().to_string());
        cli::genome_summary(genome);
        eprintln!();
    }

    cli::print_summary(start);
    Ok(())
}

/// Runs the loader on its worker thread, rendering its events as they arrive.
fn load_with_console(loader: GenomeLoader, dirs: Vec<PathBuf>) -> Result<Vec<Genome>> {
    let (tx, rx) = mpsc::channel();
    let handle = loader.spawn(dirs, Arc::new(ChannelSink::new(tx)), CancelToken::new())?;

    let mut warnings = 0usize;
    let mut genomes = None;
    let mut failure = None;
    for event in rx {
        match event {
            LoadEvent::Progress {
                message,
                current,
                total,
            } => cli::progress(&message, current, total),
            LoadEvent::Warning(message) => {
                warnings += 1;
                if warnings <= MAX_SHOWN_WARNINGS {
                    cli::end_progress();
                    cli::warning(&message);
                }
            }
            LoadEvent::Cancelled => failure = Some("load cancelled".to_string()),
            LoadEvent::Failed(message) => failure = Some(message),
            LoadEvent::Complete(loaded) => genomes = Some(loaded),
        }
    }
    cli::end_progress();

    handle
        .join()
        .map_err(|_| anyhow!("genome loader thread panicked"))?;

    if warnings > MAX_SHOWN_WARNINGS {
        cli::warning(&format!(
            "{} further warnings not shown",
            warnings - MAX_SHOWN_WARNINGS
        ));
    }
    if let Some(message) = failure {
        cli::error(&message);
        bail!("{message}");
    }
    let genomes = genomes.ok_or_else(|| anyhow!("loader finished without a result"))?;
    cli::success(&format!(
        "loaded {} genome(s) with {} warning(s)",
        genomes.len(),
        warnings
    ));
    Ok(genomes)
}
