//! Row group orchestration: one batch of records in, one row group out.

use std::sync::Arc;

use rayon::prelude::*;

use crate::accessor::AccessorCache;
use crate::column::{materialize_with, MaterializedColumn};
use crate::record::Record;
use crate::schema::Schema;
use crate::writer::error::WriteError;
use crate::writer::sink::ColumnSink;

/// Writes whole batches as row groups against a [`ColumnSink`].
///
/// Each [`write_row_group`](Self::write_row_group) call is atomic with
/// respect to the output file: either every column of the batch reaches the
/// file as one row group, or the file is untouched and the writer stays
/// usable for the next batch.
pub struct RowGroupWriter<S: ColumnSink> {
    sink: S,
    schema: Schema,
    cache: Arc<AccessorCache>,
    rows_written: u64,
    row_groups_written: usize,
}

impl<S: ColumnSink> RowGroupWriter<S> {
    /// Wrap `sink` with the process-wide accessor cache.
    pub fn new(sink: S, schema: Schema) -> Self {
        Self::with_cache(sink, schema, crate::accessor::global())
    }

    /// Wrap `sink` with an explicit accessor cache.
    pub fn with_cache(sink: S, schema: Schema, cache: Arc<AccessorCache>) -> Self {
        Self {
            sink,
            schema,
            cache,
            rows_written: 0,
            row_groups_written: 0,
        }
    }

    /// The schema every batch must satisfy.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Row groups flushed so far.
    pub fn row_groups_written(&self) -> usize {
        self.row_groups_written
    }

    /// Write `batch` as one row group.
    ///
    /// Materializes every schema field in parallel, then commits the columns
    /// to the sink in schema order and waits for all of them. On any failure
    /// the scope is aborted and the error from the first failing column (in
    /// schema order) is returned; the batch can be retried or skipped.
    pub fn write_row_group<R: Record>(&mut self, batch: &[R]) -> Result<(), WriteError> {
        if batch.is_empty() {
            return Err(WriteError::InvalidArgument(
                "batch must contain at least one record".into(),
            ));
        }

        // Materialize before touching the sink, so a bad batch never opens
        // a scope.
        let columns: Vec<MaterializedColumn> = self
            .schema
            .fields()
            .par_iter()
            .map(|field| materialize_with(&self.cache, batch, field))
            .collect::<Result<_, _>>()?;

        self.sink.open_row_group()?;
        let outcome = self.commit_all(columns);
        match outcome {
            Ok(()) => {
                self.sink.close_row_group(false)?;
                self.rows_written += batch.len() as u64;
                self.row_groups_written += 1;
                log::debug!(
                    "row group {} flushed: {} rows x {} columns",
                    self.row_groups_written,
                    batch.len(),
                    self.schema.len()
                );
                Ok(())
            }
            Err(err) => {
                // Discard the scope; close errors are secondary to the
                // commit failure being reported.
                if let Err(close_err) = self.sink.close_row_group(true) {
                    log::warn!("failed to abort row group scope: {close_err}");
                }
                Err(err)
            }
        }
    }

    /// Issue every column commit, then await completion in issue order.
    fn commit_all(&mut self, columns: Vec<MaterializedColumn>) -> Result<(), WriteError> {
        let mut handles = Vec::with_capacity(columns.len());
        for column in columns {
            handles.push(self.sink.commit_column(column)?);
        }
        let mut first_err: Option<WriteError> = None;
        for handle in handles {
            if let Err(err) = handle.wait() {
                if first_err.is_none() {
                    first_err = Some(err.into());
                }
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Tear down, returning the underlying sink for finalization.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
