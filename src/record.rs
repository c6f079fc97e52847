//! The record-side extraction contract.
//!
//! A type becomes writable by implementing [`Record`]: given a field name it
//! binds a [`FieldAccessor`] closure that reads that field out of one record
//! instance. Binding happens once per `(record type, field name)` pair — the
//! [accessor cache](crate::accessor) keeps the resolved closure and every
//! later materialization reuses it without re-binding.
//!
//! For plain structs the [`impl_record!`](crate::impl_record) macro wires
//! fields up with one line per column:
//!
//! ```rust
//! use rowpack::impl_record;
//!
//! struct Person {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl_record!(Person {
//!     "id" => id,
//!     "name" => name,
//! });
//! ```
//!
//! Hand-written `Record` impls are the escape hatch for computed columns or
//! fallible conversions (return [`ExtractError`] from the closure).

use std::sync::Arc;

use crate::value::{ExtractError, Value};

/// A bound extraction function: reads one field's value out of one record.
///
/// Accessors must be pure — the materializer invokes them concurrently
/// across a batch with no synchronization.
pub type FieldAccessor<R> = Arc<dyn Fn(&R) -> Result<Value, ExtractError> + Send + Sync>;

/// A record shape whose fields can be bound to accessors by name.
pub trait Record: Send + Sync + 'static {
    /// Human-readable shape name used in diagnostics.
    fn shape_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Bind an accessor for the named field, or `None` when the shape has no
    /// such field. Called at most once per field name per process — results
    /// are published through the accessor cache.
    fn bind(field: &str) -> Option<FieldAccessor<Self>>
    where
        Self: Sized;
}

/// Implement [`Record`] for a struct by listing `"column" => field` pairs.
///
/// Each field's value is cloned and converted through `Value::from`, so any
/// field type with a `From` impl on [`Value`](crate::value::Value) works,
/// including `Option<T>` for nullable columns.
#[macro_export]
macro_rules! impl_record {
    ($ty:ty { $($name:literal => $field:ident),+ $(,)? }) => {
        impl $crate::record::Record for $ty {
            fn bind(field: &str) -> ::std::option::Option<$crate::record::FieldAccessor<Self>> {
                match field {
                    $(
                        $name => {
                            let accessor: $crate::record::FieldAccessor<Self> =
                                ::std::sync::Arc::new(|record: &Self| {
                                    ::std::result::Result::Ok($crate::value::Value::from(
                                        record.$field.clone(),
                                    ))
                                });
                            ::std::option::Option::Some(accessor)
                        }
                    )+
                    _ => ::std::option::Option::None,
                }
            }
        }
    };
}
