//! Writer-level error type.

use crate::column::MaterializeError;
use crate::writer::sink::SinkError;

/// Errors surfaced by [`RowPackWriter`](crate::writer::RowPackWriter) and
/// [`RowGroupWriter`](crate::writer::RowGroupWriter).
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Caller passed an unusable argument (empty batch, mostly).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Writer configuration is unusable (empty path, bad option combination).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A column failed to materialize.
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// The sink rejected or failed a commit.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Filesystem failure while creating or removing the output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation called in a lifecycle state that does not permit it.
    #[error("operation not permitted while writer is {state}")]
    InvalidState {
        /// The state the writer was in.
        state: &'static str,
    },
}
