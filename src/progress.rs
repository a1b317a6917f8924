//! Progress reporting and cooperative cancellation for long-running loads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use log::{error, info, warn};

use crate::error::Error;
use crate::genome::Genome;

/// Receives notifications from a running load.
///
/// Progress is advisory. Exactly one of `on_complete`, `on_cancelled` or
/// `on_error` is delivered when a load finishes.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, _message: &str, _current: usize, _total: usize) {}

    /// A recoverable problem: the offending record was skipped.
    fn on_warning(&self, _warning: &Error) {}

    fn on_cancelled(&self) {}

    fn on_error(&self, _error: &Error) {}

    fn on_complete(&self, _genomes: Vec<Genome>) {}
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(Error::Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What a parser needs to report back: the sink and the cancellation flag.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    pub sink: &'a dyn ProgressSink,
    pub cancel: &'a CancelToken,
}

impl<'a> ParseContext<'a> {
    #[must_use]
    pub fn new(sink: &'a dyn ProgressSink, cancel: &'a CancelToken) -> Self {
        Self { sink, cancel }
    }

    pub fn warn(&self, warning: Error) {
        self.sink.on_warning(&warning);
    }

    pub fn progress(&self, message: &str, current: usize, total: usize) {
        self.sink.on_progress(message, current, total);
    }

    pub fn check_cancelled(&self) -> Result<(), Error> {
        self.cancel.check()
    }
}

/// An event forwarded by [`ChannelSink`].
#[derive(Debug)]
pub enum LoadEvent {
    Progress {
        message: String,
        current: usize,
        total: usize,
    },
    Warning(String),
    Cancelled,
    Failed(String),
    Complete(Vec<Genome>),
}

/// Forwards every notification over an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<LoadEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(sender: Sender<LoadEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: LoadEvent) {
        // The receiver going away only means nobody is listening any more.
        let _ = self.sender.send(event);
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, message: &str, current: usize, total: usize) {
        self.send(LoadEvent::Progress {
            message: message.to_string(),
            current,
            total,
        });
    }

    fn on_warning(&self, warning: &Error) {
        self.send(LoadEvent::Warning(warning.to_string()));
    }

    fn on_cancelled(&self) {
        self.send(LoadEvent::Cancelled);
    }

    fn on_error(&self, error: &Error) {
        self.send(LoadEvent::Failed(error.to_string()));
    }

    fn on_complete(&self, genomes: Vec<Genome>) {
        self.send(LoadEvent::Complete(genomes));
    }
}

/// Writes notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, message: &str, current: usize, total: usize) {
        info!("{message} ({current}/{total})");
    }

    fn on_warning(&self, warning: &Error) {
        warn!("{warning}");
    }

    fn on_cancelled(&self) {
        info!("load cancelled");
    }

    fn on_error(&self, error: &Error) {
        error!("load failed: {error}");
    }

    fn on_complete(&self, genomes: Vec<Genome>) {
        info!("loaded {} genome(s)", genomes.len());
    }
}
