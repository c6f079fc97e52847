//! Column sink abstraction.
//!
//! A [`ColumnSink`] receives materialized columns scoped to row groups. A
//! call to [`commit_column`](ColumnSink::commit_column) may encode the column
//! on a background thread; the returned [`CommitHandle`] resolves when the
//! encode finishes. Handles may complete in any order, but the row group only
//! reaches the file when [`close_row_group`](ColumnSink::close_row_group)
//! runs with `aborted = false` and every commit in the scope succeeded.

use crossbeam_channel::Receiver;

use crate::column::MaterializedColumn;

/// Errors reported by a column sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A column's encode failed.
    #[error("commit failed for column '{field}': {message}")]
    Commit {
        /// Column name.
        field: String,
        /// Failure description from the encoder.
        message: String,
    },

    /// The encoder thread for a column went away without reporting a result.
    #[error("commit worker for column '{field}' disconnected")]
    Disconnected {
        /// Column name.
        field: String,
    },

    /// Sink method called outside the state that permits it.
    #[error("sink state error: {0}")]
    State(String),

    /// Low-level Parquet failure.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one in-flight column commit.
///
/// The handle owns the receiving half of a one-shot channel; the sink's
/// encoder thread sends exactly one result on it.
#[derive(Debug)]
pub struct CommitHandle {
    field: String,
    done: Receiver<Result<(), String>>,
}

impl CommitHandle {
    /// Build a handle for `field` listening on `done`.
    pub fn new(field: impl Into<String>, done: Receiver<Result<(), String>>) -> Self {
        Self {
            field: field.into(),
            done,
        }
    }

    /// The column this commit belongs to.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Block until the commit resolves.
    pub fn wait(self) -> Result<(), SinkError> {
        match self.done.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(SinkError::Commit {
                field: self.field,
                message,
            }),
            Err(_) => Err(SinkError::Disconnected { field: self.field }),
        }
    }
}

/// Destination for materialized columns, organized into row groups.
pub trait ColumnSink {
    /// Start a new row group scope. Fails if one is already open.
    fn open_row_group(&mut self) -> Result<(), SinkError>;

    /// Hand one column to the sink for encoding. Requires an open scope.
    ///
    /// Columns must be committed in schema order; completion order is
    /// unconstrained.
    fn commit_column(&mut self, column: MaterializedColumn) -> Result<CommitHandle, SinkError>;

    /// End the current scope, joining any in-flight commits.
    ///
    /// With `aborted = false` the accumulated columns are flushed to the file
    /// as one row group; with `aborted = true` they are discarded and the
    /// file is left exactly as it was before [`open_row_group`]. Either way
    /// the sink is ready for a fresh scope afterwards.
    fn close_row_group(&mut self, aborted: bool) -> Result<(), SinkError>;
}
