//! Error types for genome annotation ingestion.

use thiserror::Error;

/// Errors that can occur while parsing, caching or loading genome annotation.
///
/// The same type is used for recoverable warnings handed to a
/// [`ProgressSink`](crate::progress::ProgressSink); whether an error is fatal
/// depends on where it is raised, not on its variant.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// A file format error was detected.
    #[error("{0}")]
    Format(String),

    /// The operation observed a cancellation request and stopped.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
