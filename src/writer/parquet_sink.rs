//! Parquet-backed [`ColumnSink`].
//!
//! Columns are encoded off-thread: each commit takes the next
//! [`ArrowColumnWriter`] for the row group, moves it with the column's array
//! into a dedicated worker thread, and hands back a [`CommitHandle`]. The
//! resulting column chunks are only appended to the file, in schema order,
//! when the scope closes cleanly; an aborted scope discards every chunk and
//! the file stays byte-identical to its pre-scope state.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;

use arrow::datatypes::SchemaRef;
use crossbeam_channel::{bounded, Receiver};
use parquet::arrow::arrow_writer::{
    compute_leaves, get_column_writers, ArrowColumnChunk, ArrowColumnWriter,
};
use parquet::arrow::ArrowSchemaConverter;
use parquet::file::properties::WriterPropertiesPtr;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::SchemaDescriptor;

use crate::column::MaterializedColumn;
use crate::schema::Schema;
use crate::writer::config::WriterConfig;
use crate::writer::sink::{ColumnSink, CommitHandle, SinkError};

/// Footer-derived totals for a finished file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSummary {
    /// Total rows across all row groups.
    pub rows: u64,
    /// Number of row groups in the file.
    pub row_groups: usize,
    /// Compressed bytes occupied by row group data.
    pub bytes: u64,
}

/// One open row group scope.
struct ScopeState {
    /// Column writers not yet claimed by a commit, in schema order.
    writers: VecDeque<ArrowColumnWriter>,
    /// In-flight and finished encodes, in commit (= schema) order.
    pending: Vec<PendingColumn>,
}

struct PendingColumn {
    field: String,
    chunk: Receiver<Result<ArrowColumnChunk, String>>,
    worker: JoinHandle<()>,
}

/// [`ColumnSink`] writing Parquet through [`SerializedFileWriter`].
pub struct ParquetColumnSink<W: Write + Send> {
    writer: SerializedFileWriter<W>,
    arrow_schema: SchemaRef,
    parquet_schema: SchemaDescriptor,
    properties: WriterPropertiesPtr,
    scope: Option<ScopeState>,
}

impl<W: Write + Send> ParquetColumnSink<W> {
    /// Open a sink over `destination` for `schema`, with encoding and
    /// compression taken from `config`.
    pub fn try_new(
        destination: W,
        schema: &Schema,
        config: &WriterConfig,
    ) -> Result<Self, SinkError> {
        let arrow_schema = schema.to_arrow();
        let properties: WriterPropertiesPtr = Arc::new(config.to_writer_properties(schema));
        let parquet_schema = ArrowSchemaConverter::new().convert(&arrow_schema)?;
        let writer = SerializedFileWriter::new(
            destination,
            parquet_schema.root_schema_ptr(),
            Arc::clone(&properties),
        )?;
        Ok(Self {
            writer,
            arrow_schema,
            parquet_schema,
            properties,
            scope: None,
        })
    }

    /// Abort any open scope, write the footer, and return the file totals.
    pub fn finish(mut self) -> Result<FileSummary, SinkError> {
        if self.scope.is_some() {
            self.close_row_group(true)?;
        }
        let metadata = self.writer.close()?;
        let bytes = metadata
            .row_groups
            .iter()
            .map(|rg| rg.total_compressed_size.unwrap_or(rg.total_byte_size) as u64)
            .sum();
        Ok(FileSummary {
            rows: metadata.num_rows as u64,
            row_groups: metadata.row_groups.len(),
            bytes,
        })
    }

    /// Join every worker in `scope` and collect the encoded chunks in commit
    /// order. The first failure wins; later workers are still joined so no
    /// thread outlives the scope.
    fn drain_scope(scope: ScopeState) -> Result<Vec<ArrowColumnChunk>, SinkError> {
        let mut chunks = Vec::with_capacity(scope.pending.len());
        let mut first_err: Option<SinkError> = None;
        for pending in scope.pending {
            let outcome = match pending.chunk.recv() {
                Ok(Ok(chunk)) => Ok(chunk),
                Ok(Err(message)) => Err(SinkError::Commit {
                    field: pending.field.clone(),
                    message,
                }),
                Err(_) => Err(SinkError::Disconnected {
                    field: pending.field.clone(),
                }),
            };
            let _ = pending.worker.join();
            match outcome {
                Ok(chunk) => chunks.push(chunk),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        match first_err {
            None => Ok(chunks),
            Some(err) => Err(err),
        }
    }
}

impl<W: Write + Send> ColumnSink for ParquetColumnSink<W> {
    fn open_row_group(&mut self) -> Result<(), SinkError> {
        if self.scope.is_some() {
            return Err(SinkError::State("a row group scope is already open".into()));
        }
        let writers = get_column_writers(&self.parquet_schema, &self.properties, &self.arrow_schema)?;
        self.scope = Some(ScopeState {
            writers: writers.into(),
            pending: Vec::with_capacity(self.arrow_schema.fields().len()),
        });
        Ok(())
    }

    fn commit_column(&mut self, column: MaterializedColumn) -> Result<CommitHandle, SinkError> {
        let scope = self
            .scope
            .as_mut()
            .ok_or_else(|| SinkError::State("no row group scope is open".into()))?;
        let mut writer = scope.writers.pop_front().ok_or_else(|| {
            SinkError::State(format!(
                "all {} columns of this row group are already committed",
                self.arrow_schema.fields().len()
            ))
        })?;

        let field = column.field().name().to_owned();
        let arrow_field = column.field().to_arrow();
        let values = Arc::clone(column.values());
        let (chunk_tx, chunk_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);

        let worker = std::thread::Builder::new()
            .name(format!("rowpack-commit-{field}"))
            .spawn(move || {
                let result = compute_leaves(&arrow_field, &values)
                    .and_then(|leaves| {
                        for leaf in leaves {
                            writer.write(&leaf)?;
                        }
                        writer.close()
                    })
                    .map_err(|e| e.to_string());
                let status = result.as_ref().map(|_| ()).map_err(Clone::clone);
                let _ = chunk_tx.send(result);
                let _ = done_tx.send(status);
            })?;

        scope.pending.push(PendingColumn {
            field: field.clone(),
            chunk: chunk_rx,
            worker,
        });
        Ok(CommitHandle::new(field, done_rx))
    }

    fn close_row_group(&mut self, aborted: bool) -> Result<(), SinkError> {
        let scope = self
            .scope
            .take()
            .ok_or_else(|| SinkError::State("no row group scope is open".into()))?;

        if aborted {
            // Join workers and drop whatever they produced; nothing has
            // touched the file yet.
            let _ = Self::drain_scope(scope);
            return Ok(());
        }

        if !scope.writers.is_empty() {
            let missing = scope.writers.len();
            // Join the commits that were issued before erroring out.
            let _ = Self::drain_scope(scope);
            return Err(SinkError::State(format!(
                "row group closed with {missing} uncommitted columns"
            )));
        }

        let chunks = Self::drain_scope(scope)?;
        let mut row_group = self.writer.next_row_group()?;
        for chunk in chunks {
            chunk.append_to_row_group(&mut row_group)?;
        }
        row_group.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::materialize_with;
    use crate::accessor::AccessorCache;
    use crate::schema::ElementType;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    #[derive(Clone)]
    struct Point {
        x: i64,
        y: f64,
    }

    crate::impl_record!(Point {
        "x" => x,
        "y" => y,
    });

    fn schema() -> Schema {
        Schema::builder()
            .field("x", ElementType::Int64)
            .field("y", ElementType::Float64)
            .build()
            .unwrap()
    }

    fn points(n: i64) -> Vec<Point> {
        (0..n)
            .map(|i| Point {
                x: i,
                y: i as f64 * 0.5,
            })
            .collect()
    }

    fn commit_batch<W: Write + Send>(
        sink: &mut ParquetColumnSink<W>,
        cache: &AccessorCache,
        schema: &Schema,
        batch: &[Point],
    ) -> Vec<CommitHandle> {
        sink.open_row_group().unwrap();
        schema
            .fields()
            .iter()
            .map(|field| {
                let column = materialize_with(cache, batch, field).unwrap();
                sink.commit_column(column).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_flushed_row_group_is_readable() {
        let schema = schema();
        let cache = AccessorCache::new();
        let mut sink = ParquetColumnSink::try_new(
            Vec::new(),
            &schema,
            &WriterConfig::default(),
        )
        .unwrap();

        let handles = commit_batch(&mut sink, &cache, &schema, &points(100));
        for handle in handles {
            handle.wait().unwrap();
        }
        sink.close_row_group(false).unwrap();
        let summary = sink.finish().unwrap();
        assert_eq!(summary.rows, 100);
        assert_eq!(summary.row_groups, 1);
        assert!(summary.bytes > 0);
    }

    #[test]
    fn test_aborted_scope_leaves_no_row_group() {
        let schema = schema();
        let cache = AccessorCache::new();
        let mut sink = ParquetColumnSink::try_new(
            Vec::new(),
            &schema,
            &WriterConfig::default(),
        )
        .unwrap();

        let handles = commit_batch(&mut sink, &cache, &schema, &points(50));
        for handle in handles {
            handle.wait().unwrap();
        }
        sink.close_row_group(true).unwrap();

        let handles = commit_batch(&mut sink, &cache, &schema, &points(25));
        for handle in handles {
            handle.wait().unwrap();
        }
        sink.close_row_group(false).unwrap();
        let summary = sink.finish().unwrap();
        assert_eq!(summary.rows, 25);
        assert_eq!(summary.row_groups, 1);
    }

    #[test]
    fn test_double_open_rejected() {
        let schema = schema();
        let mut sink = ParquetColumnSink::try_new(
            Vec::new(),
            &schema,
            &WriterConfig::default(),
        )
        .unwrap();
        sink.open_row_group().unwrap();
        assert!(matches!(sink.open_row_group(), Err(SinkError::State(_))));
    }

    #[test]
    fn test_close_with_missing_columns_rejected() {
        let schema = schema();
        let cache = AccessorCache::new();
        let mut sink = ParquetColumnSink::try_new(
            Vec::new(),
            &schema,
            &WriterConfig::default(),
        )
        .unwrap();
        sink.open_row_group().unwrap();
        let batch = points(10);
        let column = materialize_with(&cache, &batch, &schema.fields()[0]).unwrap();
        sink.commit_column(column).unwrap().wait().unwrap();
        assert!(matches!(
            sink.close_row_group(false),
            Err(SinkError::State(_))
        ));
    }

    #[test]
    fn test_footer_carries_schema_metadata() {
        let schema = schema();
        let cache = AccessorCache::new();
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut sink = ParquetColumnSink::try_new(
            file.reopen().unwrap(),
            &schema,
            &WriterConfig::default(),
        )
        .unwrap();
        let handles = commit_batch(&mut sink, &cache, &schema, &points(5));
        for handle in handles {
            handle.wait().unwrap();
        }
        sink.close_row_group(false).unwrap();
        sink.finish().unwrap();

        let reader = SerializedFileReader::new(file.reopen().unwrap()).unwrap();
        let kv = reader
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .expect("footer metadata present");
        assert!(kv
            .iter()
            .any(|e| e.key == crate::schema::FORMAT_VERSION_KEY));
        assert!(kv
            .iter()
            .any(|e| e.key == crate::schema::SCHEMA_METADATA_KEY));
    }
}
