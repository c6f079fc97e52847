//! Column materialization: batch of records -> one dense Arrow array.
//!
//! [`materialize`] resolves the field's accessor through the
//! [accessor cache](crate::accessor), fans the per-row extraction out across
//! the rayon pool, and packs the extracted values into an Arrow array typed
//! per the field's [`ElementType`](crate::schema::ElementType). Slot `i` of
//! the output always corresponds to `batch[i]` — the parallel map is indexed,
//! so worker scheduling cannot reorder results.
//!
//! A single failing row fails the whole column; partial output is discarded.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder,
    Int64Builder, StringBuilder,
};
use rayon::prelude::*;

use crate::accessor::{AccessorCache, BindError};
use crate::record::Record;
use crate::schema::{ElementType, FieldDescriptor};
use crate::value::{ExtractError, Value};

/// Errors from materializing one column.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// The input batch had no records.
    #[error("cannot materialize an empty batch")]
    EmptyBatch,

    /// Accessor resolution failed for the field.
    #[error(transparent)]
    Binding(#[from] BindError),

    /// A value could not be read or converted from a specific record.
    #[error("extraction failed for field '{field}': {source}")]
    Extraction {
        /// Name of the field being extracted.
        field: String,
        /// Underlying extraction failure.
        source: ExtractError,
    },
}

/// One field's dense column for one batch: descriptor plus typed array.
///
/// `values().len()` equals the source batch length, and `values()` slot `i`
/// was extracted from record `i`.
#[derive(Debug, Clone)]
pub struct MaterializedColumn {
    field: FieldDescriptor,
    values: ArrayRef,
}

impl MaterializedColumn {
    /// The field this column belongs to.
    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    /// The packed values, one per source record, in record order.
    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column has no rows. Never true for a column produced by
    /// [`materialize`].
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Materialize one column from `batch` using the process-wide accessor cache.
///
/// # Errors
///
/// [`MaterializeError::EmptyBatch`] for an empty batch,
/// [`MaterializeError::Binding`] when the field cannot be bound on `R`, and
/// [`MaterializeError::Extraction`] when any record's value fails to extract
/// or does not match the field's declared element type.
pub fn materialize<R: Record>(
    batch: &[R],
    field: &FieldDescriptor,
) -> Result<MaterializedColumn, MaterializeError> {
    materialize_with(&crate::accessor::global(), batch, field)
}

/// [`materialize`] against an explicit cache instance.
///
/// Call sites that need cache isolation (tests, mostly) supply their own
/// [`AccessorCache`]; behavior is otherwise identical.
pub fn materialize_with<R: Record>(
    cache: &AccessorCache,
    batch: &[R],
    field: &FieldDescriptor,
) -> Result<MaterializedColumn, MaterializeError> {
    if batch.is_empty() {
        return Err(MaterializeError::EmptyBatch);
    }

    let accessor = cache.resolve::<R>(field.name())?;

    // Indexed parallel map: output slot i is record i regardless of which
    // worker ran it. First extraction failure wins; partial output is
    // dropped with the collect.
    let values: Vec<Value> = batch
        .par_iter()
        .map(|record| accessor(record))
        .collect::<Result<_, _>>()
        .map_err(|source| MaterializeError::Extraction {
            field: field.name().to_owned(),
            source,
        })?;

    let values = build_array(field, &values)?;
    Ok(MaterializedColumn {
        field: field.clone(),
        values,
    })
}

/// Pack extracted values into an array typed per the field descriptor.
///
/// Strict variant matching: no implicit widening, and `Null` is only legal
/// for nullable fields.
fn build_array(field: &FieldDescriptor, values: &[Value]) -> Result<ArrayRef, MaterializeError> {
    let mismatch = |value: &Value| MaterializeError::Extraction {
        field: field.name().to_owned(),
        source: ExtractError::new(format!(
            "value of type {} does not fit {:?} column{}",
            value.variant_name(),
            field.element_type(),
            if value.is_null() && !field.is_nullable() {
                " (field is not nullable)"
            } else {
                ""
            }
        )),
    };

    macro_rules! pack {
        ($builder:ty, $variant:path) => {{
            let mut builder = <$builder>::with_capacity(values.len());
            for value in values {
                match value {
                    $variant(v) => builder.append_value(v.clone()),
                    Value::Null if field.is_nullable() => builder.append_null(),
                    other => return Err(mismatch(other)),
                }
            }
            Arc::new(builder.finish()) as ArrayRef
        }};
    }

    let array: ArrayRef = match field.element_type() {
        ElementType::Bool => pack!(BooleanBuilder, Value::Bool),
        ElementType::Int32 => pack!(Int32Builder, Value::Int32),
        ElementType::Int64 => pack!(Int64Builder, Value::Int64),
        ElementType::Float32 => pack!(Float32Builder, Value::Float32),
        ElementType::Float64 => pack!(Float64Builder, Value::Float64),
        ElementType::Utf8 => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    Value::Utf8(v) => builder.append_value(v),
                    Value::Null if field.is_nullable() => builder.append_null(),
                    other => return Err(mismatch(other)),
                }
            }
            Arc::new(builder.finish())
        }
        ElementType::Binary => {
            let mut builder = BinaryBuilder::new();
            for value in values {
                match value {
                    Value::Binary(v) => builder.append_value(v),
                    Value::Null if field.is_nullable() => builder.append_null(),
                    other => return Err(mismatch(other)),
                }
            }
            Arc::new(builder.finish())
        }
    };

    Ok(array)
}
