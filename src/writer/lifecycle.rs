//! Writer lifecycle: unopened -> open -> closed.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::accessor::AccessorCache;
use crate::record::Record;
use crate::schema::Schema;
use crate::writer::config::WriterConfig;
use crate::writer::error::WriteError;
use crate::writer::parquet_sink::ParquetColumnSink;
use crate::writer::row_group::RowGroupWriter;
use crate::writer::stats::WriterStats;

struct OpenState {
    inner: RowGroupWriter<ParquetColumnSink<File>>,
    path: PathBuf,
}

enum WriterState {
    Unopened,
    Open(Box<OpenState>),
    Closed,
}

impl WriterState {
    fn name(&self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Open(_) => "open",
            Self::Closed => "closed",
        }
    }
}

/// File-backed batch writer with an explicit open/close lifecycle.
///
/// Construct with [`new`](Self::new), bind to an output file with
/// [`init`](Self::init) (or use [`create`](Self::create) to do both), push
/// batches with [`write_row_group`](Self::write_row_group), and finish with
/// [`close`](Self::close). A failed batch leaves the file valid and the
/// writer open; the same or a corrected batch can be written next.
///
/// Dropping an open writer closes it best-effort and logs a warning; call
/// [`close`](Self::close) explicitly to observe errors and final totals.
pub struct RowPackWriter {
    config: WriterConfig,
    cache: Arc<AccessorCache>,
    state: WriterState,
    final_stats: Option<WriterStats>,
}

impl RowPackWriter {
    /// New unopened writer with `config`.
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            cache: crate::accessor::global(),
            state: WriterState::Unopened,
            final_stats: None,
        }
    }

    /// Like [`new`], but binding accessors through an explicit cache.
    pub fn with_cache(config: WriterConfig, cache: Arc<AccessorCache>) -> Self {
        Self {
            config,
            cache,
            state: WriterState::Unopened,
            final_stats: None,
        }
    }

    /// Create the writer and open it on `path` in one step.
    pub fn create(
        path: impl AsRef<Path>,
        schema: Schema,
        config: WriterConfig,
    ) -> Result<Self, WriteError> {
        let mut writer = Self::new(config);
        writer.init(path, schema)?;
        Ok(writer)
    }

    /// Open the output file and prepare for row groups.
    ///
    /// Only legal on an unopened writer. If sink setup fails after the file
    /// was created, the partial file is removed best-effort.
    pub fn init(&mut self, path: impl AsRef<Path>, schema: Schema) -> Result<(), WriteError> {
        if !matches!(self.state, WriterState::Unopened) {
            return Err(WriteError::InvalidState {
                state: self.state.name(),
            });
        }
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(WriteError::Configuration(
                "output path must not be empty".into(),
            ));
        }
        self.config.validate().map_err(WriteError::Configuration)?;

        let file = File::create(path)?;
        let sink = match ParquetColumnSink::try_new(file, &schema, &self.config) {
            Ok(sink) => sink,
            Err(err) => {
                if let Err(rm_err) = std::fs::remove_file(path) {
                    log::warn!(
                        "could not remove partial file {}: {rm_err}",
                        path.display()
                    );
                }
                return Err(err.into());
            }
        };

        log::info!(
            "writer opened on {} ({} columns)",
            path.display(),
            schema.len()
        );
        self.state = WriterState::Open(Box::new(OpenState {
            inner: RowGroupWriter::with_cache(sink, schema, Arc::clone(&self.cache)),
            path: path.to_path_buf(),
        }));
        Ok(())
    }

    /// Write one batch as one row group. Requires an open writer.
    pub fn write_row_group<R: Record>(&mut self, batch: &[R]) -> Result<(), WriteError> {
        match &mut self.state {
            WriterState::Open(open) => open.inner.write_row_group(batch),
            other => Err(WriteError::InvalidState { state: other.name() }),
        }
    }

    /// Finish the file and return its totals.
    ///
    /// Idempotent: the first close on an open writer writes the footer and
    /// returns `Some(stats)`; any later call (or a close on a never-opened
    /// writer) returns `Ok(None)`.
    pub fn close(&mut self) -> Result<Option<WriterStats>, WriteError> {
        match std::mem::replace(&mut self.state, WriterState::Closed) {
            WriterState::Open(open) => {
                let path = open.path;
                let summary = open.inner.into_sink().finish()?;
                let stats = WriterStats {
                    rows_written: summary.rows,
                    row_groups_written: summary.row_groups,
                    bytes_written: summary.bytes,
                };
                log::info!("writer closed on {}: {stats}", path.display());
                self.final_stats = Some(stats);
                Ok(Some(stats))
            }
            WriterState::Unopened | WriterState::Closed => Ok(None),
        }
    }

    /// Current totals. Bytes are only known once the file is closed.
    pub fn stats(&self) -> WriterStats {
        if let Some(stats) = self.final_stats {
            return stats;
        }
        match &self.state {
            WriterState::Open(open) => WriterStats {
                rows_written: open.inner.rows_written(),
                row_groups_written: open.inner.row_groups_written(),
                bytes_written: 0,
            },
            _ => WriterStats::default(),
        }
    }

    /// Whether the writer currently accepts batches.
    pub fn is_open(&self) -> bool {
        matches!(self.state, WriterState::Open(_))
    }
}

impl Drop for RowPackWriter {
    fn drop(&mut self) {
        if matches!(self.state, WriterState::Open(_)) {
            log::warn!("writer dropped while open; closing best-effort");
            if let Err(err) = self.close() {
                log::error!("failed to close writer on drop: {err}");
            }
        }
    }
}
