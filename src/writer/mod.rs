//! # Batch writer
//!
//! Turns batches of records into Parquet row groups, one row group per
//! batch. The stack has three layers:
//!
//! | Layer | Type | Responsibility |
//! |-------|------|----------------|
//! | Lifecycle | [`RowPackWriter`] | open/close state machine over a file |
//! | Orchestration | [`RowGroupWriter`] | materialize columns, commit, await |
//! | Sink | [`ParquetColumnSink`] | off-thread encode, ordered append |
//!
//! Batches are atomic: a failed batch aborts its row group scope, leaves the
//! file valid, and the writer stays open for a retry.
//!
//! ```no_run
//! use rowpack::prelude::*;
//!
//! #[derive(Clone)]
//! struct Event {
//!     id: i64,
//!     kind: String,
//! }
//!
//! rowpack::impl_record!(Event {
//!     "id" => id,
//!     "kind" => kind,
//! });
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::builder()
//!     .field("id", ElementType::Int64)
//!     .field("kind", ElementType::Utf8)
//!     .build()?;
//!
//! let mut writer = RowPackWriter::create("events.parquet", schema, WriterConfig::default())?;
//! writer.write_row_group(&[Event { id: 1, kind: "login".into() }])?;
//! let stats = writer.close()?.expect("first close returns totals");
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod lifecycle;
mod parquet_sink;
mod row_group;
mod sink;
mod stats;


pub use config::{CompressionType, WriterConfig};
pub use error::WriteError;
pub use lifecycle::RowPackWriter;
pub use parquet_sink::{FileSummary, ParquetColumnSink};
pub use row_group::RowGroupWriter;
pub use sink::{ColumnSink, CommitHandle, SinkError};
pub use stats::WriterStats;
