//! # rowpack - Batched Row-to-Columnar Parquet Writing
//!
//! `rowpack` turns batches of plain Rust structs into columnar Parquet files,
//! one row group per batch, with the per-field extraction and encoding fanned
//! out across threads.
//!
//! ## Key Features
//!
//! - **Accessor Cache**: Field accessors are bound once per `(type, field)`
//!   pair and shared process-wide, so the per-batch hot path is a cached
//!   closure call, never a by-name lookup.
//!
//! - **Parallel Materialization**: Every schema field of a batch is extracted
//!   in parallel on the rayon pool; results always land in record order.
//!
//! - **Off-Thread Encoding**: Column chunks are compressed on dedicated
//!   worker threads and appended to the file in schema order once all of a
//!   batch's columns complete.
//!
//! - **Atomic Batches**: A failed batch aborts its row group scope; the file
//!   stays valid and the writer stays open, so the caller can retry or skip.
//!
//! - **Self-Describing Files**: The schema description and format version
//!   are embedded in the Parquet footer as key-value metadata.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rowpack::prelude::*;
//!
//! #[derive(Clone)]
//! struct Measurement {
//!     sensor: String,
//!     value: f64,
//!     ok: bool,
//! }
//!
//! rowpack::impl_record!(Measurement {
//!     "sensor" => sensor,
//!     "value" => value,
//!     "ok" => ok,
//! });
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::builder()
//!     .field("sensor", ElementType::Utf8)
//!     .field("value", ElementType::Float64)
//!     .field("ok", ElementType::Bool)
//!     .build()?;
//!
//! let mut writer = RowPackWriter::create(
//!     "measurements.parquet",
//!     schema,
//!     WriterConfig::default(),
//! )?;
//!
//! writer.write_row_group(&[
//!     Measurement { sensor: "a".into(), value: 1.5, ok: true },
//!     Measurement { sensor: "b".into(), value: 2.5, ok: false },
//! ])?;
//!
//! let stats = writer.close()?.expect("first close returns totals");
//! println!("wrote {stats}");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod accessor;
pub mod column;
pub mod record;
pub mod schema;
pub mod value;
pub mod writer;

/// Commonly used types, re-exported for glob import.
pub mod prelude {
    pub use crate::accessor::AccessorCache;
    pub use crate::column::{materialize, MaterializedColumn};
    pub use crate::record::{FieldAccessor, Record};
    pub use crate::schema::{ElementType, FieldDescriptor, Schema, SchemaBuilder};
    pub use crate::value::Value;
    pub use crate::writer::{
        CompressionType, RowGroupWriter, RowPackWriter, WriteError, WriterConfig, WriterStats,
    };
}
