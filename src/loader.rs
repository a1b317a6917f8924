//! Loading genome directories, from the cache when possible and from the
//! EMBL/GFF sources otherwise.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::annotation::{AnnotationSet, DEFAULT_ANNOTATION_SET_SIZE};
use crate::cache::{self, ALIASES, CHR_LIST, CORE_ANNOTATION_NAME, CacheStatus, SourceKind};
use crate::embl::{self, EmblEntry};
use crate::error::Error;
use crate::genome::Genome;
use crate::gff::{self, GffOptions};
use crate::progress::{CancelToken, ParseContext, ProgressSink};

/// Runtime settings for a load.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Written to, and compared against, the cache marker.
    pub version: String,
    /// EMBL feature types to leave out, compared case-insensitively.
    pub ignored_feature_types: Vec<String>,
    pub annotation_set_size: usize,
    pub gff_prefix: String,
    pub progress_interval: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            ignored_feature_types: Vec::new(),
            annotation_set_size: DEFAULT_ANNOTATION_SET_SIZE,
            gff_prefix: String::new(),
            progress_interval: 1000,
        }
    }
}

impl LoaderOptions {
    #[must_use]
    pub fn includes_feature_type(&self, feature_type: &str) -> bool {
        !self
            .ignored_feature_types
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(feature_type))
    }

    #[must_use]
    pub fn gff_options(&self) -> GffOptions {
        GffOptions {
            prefix: self.gff_prefix.clone(),
            annotation_set_size: self.annotation_set_size,
            progress_interval: self.progress_interval,
        }
    }
}

/// The text parsers a loader runs over a directory's source files.
pub trait SourceParser {
    fn parse_embl_file(
        &self,
        path: &Path,
        genome: &mut Genome,
        annotation: &mut AnnotationSet,
        include: &dyn Fn(&str) -> bool,
        ctx: ParseContext<'_>,
    ) -> Result<Vec<EmblEntry>, Error>;

    fn parse_gff_file(
        &self,
        path: &Path,
        genome: &mut Genome,
        options: &GffOptions,
        ctx: ParseContext<'_>,
    ) -> Result<Vec<AnnotationSet>, Error>;
}

/// The EMBL and GFF3/GTF readers of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatFileParser;

impl SourceParser for FlatFileParser {
    fn parse_embl_file(
        &self,
        path: &Path,
        genome: &mut Genome,
        annotation: &mut AnnotationSet,
        include: &dyn Fn(&str) -> bool,
        ctx: ParseContext<'_>,
    ) -> Result<Vec<EmblEntry>, Error> {
        embl::parse_embl_file(path, genome, annotation, include, ctx)
    }

    fn parse_gff_file(
        &self,
        path: &Path,
        genome: &mut Genome,
        options: &GffOptions,
        ctx: ParseContext<'_>,
    ) -> Result<Vec<AnnotationSet>, Error> {
        gff::parse_gff_file(path, genome, options, ctx)
    }
}

/// Loads genome directories one after another.
#[derive(Debug)]
pub struct GenomeLoader<P = FlatFileParser> {
    parser: P,
    options: LoaderOptions,
}

impl GenomeLoader<FlatFileParser> {
    #[must_use]
    pub fn new(options: LoaderOptions) -> Self {
        Self::with_parser(FlatFileParser, options)
    }
}

impl<P: SourceParser> GenomeLoader<P> {
    #[must_use]
    pub fn with_parser(parser: P, options: LoaderOptions) -> Self {
        Self { parser, options }
    }

    #[must_use]
    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Loads every directory. The first fatal error or a cancellation aborts
    /// the whole load and no genome is returned.
    pub fn load(&self, dirs: &[PathBuf], ctx: ParseContext<'_>) -> Result<Vec<Genome>, Error> {
        let mut genomes = Vec::with_capacity(dirs.len());
        for dir in dirs {
            ctx.check_cancelled()?;
            genomes.push(self.load_genome(dir, ctx)?);
        }
        Ok(genomes)
    }

    /// Loads one directory, reloading its cache if it is still valid.
    pub fn load_genome(&self, base: &Path, ctx: ParseContext<'_>) -> Result<Genome, Error> {
        let mut genome = Genome::new(base)?;

        match cache::check_cache(base, &self.options.version)? {
            CacheStatus::Valid => {
                info!("Reloading cached annotation for {}", base.display());
                let core = cache::reload(base, &mut genome, ctx)?;
                genome.annotations_mut().add_sets(vec![core]);
            }
            CacheStatus::Missing => {
                info!("No annotation cache in {}, parsing", base.display());
                self.parse_genome(base, &mut genome, ctx)?;
            }
            CacheStatus::Invalid(reason) => {
                warn!("{reason}, reparsing {}", base.display());
                cache::invalidate(base);
                self.parse_genome(base, &mut genome, ctx)?;
            }
        }

        let aliases = base.join(ALIASES);
        if aliases.exists() {
            cache::read_aliases(&aliases, &mut genome)?;
        }
        Ok(genome)
    }

    fn parse_genome(&self, base: &Path, genome: &mut Genome, ctx: ParseContext<'_>) -> Result<(), Error> {
        let chr_list = base.join(CHR_LIST);
        if chr_list.exists() {
            cache::read_chr_list(&chr_list, genome)?;
            // Source files may already refer to aliased names.
            let aliases = base.join(ALIASES);
            if aliases.exists() {
                cache::read_aliases(&aliases, genome)?;
            }
        }

        let mut core = AnnotationSet::new(CORE_ANNOTATION_NAME);
        let include = |feature_type: &str| self.options.includes_feature_type(feature_type);

        let embl_files = cache::source_files(base, Some(SourceKind::Embl))?;
        for (i, path) in embl_files.iter().enumerate() {
            ctx.check_cancelled()?;
            ctx.progress(
                &format!("Loading Genome File {}", display_name(path)),
                i,
                embl_files.len(),
            );
            self.parser
                .parse_embl_file(path, genome, &mut core, &include, ctx)?;
        }

        let gff_options = self.options.gff_options();
        let gff_files = cache::source_files(base, Some(SourceKind::Gff))?;
        for (i, path) in gff_files.iter().enumerate() {
            ctx.check_cancelled()?;
            ctx.progress(
                &format!("Loading Genome File {}", display_name(path)),
                i,
                gff_files.len(),
            );
            for set in self.parser.parse_gff_file(path, genome, &gff_options, ctx)? {
                for feature in set.into_features()? {
                    core.add_feature(feature)?;
                }
            }
        }

        ctx.check_cancelled()?;
        ctx.progress("Caching annotation data", 1, 1);
        cache::persist(base, genome, &mut core, &self.options.version)?;
        genome.annotations_mut().add_sets(vec![core]);
        Ok(())
    }

    /// Loads `dirs` and reports the outcome: exactly one of `on_complete`,
    /// `on_cancelled` or `on_error` reaches the sink.
    pub fn run(&self, dirs: &[PathBuf], sink: &dyn ProgressSink, cancel: &CancelToken) {
        let ctx = ParseContext::new(sink, cancel);
        match self.load(dirs, ctx) {
            Ok(genomes) => sink.on_complete(genomes),
            Err(e) if e.is_cancelled() => sink.on_cancelled(),
            Err(e) => sink.on_error(&e),
        }
    }
}

impl<P: SourceParser + Send + 'static> GenomeLoader<P> {
    /// Runs the load on a worker thread that owns every genome it builds.
    pub fn spawn(
        self,
        dirs: Vec<PathBuf>,
        sink: Arc<dyn ProgressSink>,
        cancel: CancelToken,
    ) -> Result<JoinHandle<()>, Error> {
        let handle = thread::Builder::new()
            .name("genome-loader".to_string())
            .spawn(move || self.run(&dirs, sink.as_ref(), &cancel))?;
        Ok(handle)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
