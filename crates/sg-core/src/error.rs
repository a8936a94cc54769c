//! Engine error kinds.

use thiserror::Error;

/// Fatal reconstruction errors.
///
/// Any of these aborts the whole run. No series accompanies an error, so a
/// caller can never mistake half-reconstructed figures for valid ones.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The two blobs were not exactly one roster export and one action log.
    #[error("expected one roster export and one action log: {detail}")]
    UnrecognizedInputPair { detail: String },

    /// A line matched an event that carries money but no amount was found.
    #[error("missing amount on log line {ordinal}: {line}")]
    MalformedAmount {
        /// 1-based position of the line in chronological order.
        ordinal: usize,
        line: String,
    },

    /// A blob could not be read as delimited UTF-8 text.
    #[error("unreadable export: {0}")]
    Unreadable(#[from] csv::Error),

    /// Two series folded into one name had different hand counts.
    #[error("cannot merge series for {name}: {left} hands vs {right} hands")]
    SeriesLengthMismatch {
        name: String,
        left: usize,
        right: usize,
    },
}

/// Failure reported by an external name directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory could not be reached or queried.
    #[error("name directory unavailable: {0}")]
    Unavailable(String),
}
