//! Process-wide field-accessor cache.
//!
//! Binding a field accessor (see [`Record::bind`]) is the slow, once-per-key
//! step; everything after the first resolution for a given
//! `(record type, field name)` pair is a read-lock hash probe plus an `Arc`
//! clone. Entries are published at most once and never evicted — the cache
//! lives for the process.
//!
//! Unrelated writers and record shapes share the [`global`] instance safely.
//! Concurrent first-use of the same key may bind twice, but only one result
//! is published and every caller observes that single winner.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use crate::record::{FieldAccessor, Record};

/// Errors from accessor resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BindError {
    /// The requested field name was empty. A configuration mistake, caught
    /// before any record is touched.
    #[error("field name is empty")]
    EmptyFieldName,

    /// The record shape exposes no field with the requested name.
    #[error("record shape '{shape}' has no field named '{field}'")]
    UnknownField {
        /// Diagnostic name of the record shape.
        shape: &'static str,
        /// The field name that failed to bind.
        field: String,
    },
}

type CacheKey = (TypeId, String);

/// Concurrent map from `(record type, field name)` to a bound accessor.
///
/// The stored accessor is type-erased behind `Any`; the `TypeId` half of the
/// key guarantees an entry only ever holds the `FieldAccessor<R>` of its own
/// `R`, so the downcast on the read path cannot fail.
pub struct AccessorCache {
    entries: RwLock<HashMap<CacheKey, Box<dyn Any + Send + Sync>>>,
}

impl AccessorCache {
    /// Create an empty cache. Production code uses [`global`]; tests may
    /// build private instances to observe population from a clean slate.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the accessor for `field` on record shape `R`.
    ///
    /// First resolution for a key binds via [`Record::bind`] and publishes
    /// the result; later resolutions return the published closure without
    /// re-binding. Racing first resolutions both bind, but `or_insert`
    /// keeps a single winner.
    ///
    /// # Errors
    ///
    /// [`BindError::EmptyFieldName`] for an empty name,
    /// [`BindError::UnknownField`] when the shape has no such field.
    pub fn resolve<R: Record>(&self, field: &str) -> Result<FieldAccessor<R>, BindError> {
        if field.is_empty() {
            return Err(BindError::EmptyFieldName);
        }

        let key = (TypeId::of::<R>(), field.to_owned());

        {
            let entries = self.entries.read().unwrap();
            if let Some(entry) = entries.get(&key) {
                return Ok(Self::downcast::<R>(entry.as_ref()));
            }
        }

        // Bind outside any lock: compilation may be arbitrarily slow and
        // must not serialize resolution of unrelated keys.
        let bound = R::bind(field).ok_or_else(|| BindError::UnknownField {
            shape: R::shape_name(),
            field: field.to_owned(),
        })?;

        log::debug!(
            "bound accessor for field '{}' on shape '{}'",
            field,
            R::shape_name()
        );

        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(key).or_insert_with(|| Box::new(bound));
        Ok(Self::downcast::<R>(entry.as_ref()))
    }

    /// Number of published entries, across all record shapes.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn downcast<R: Record>(entry: &(dyn Any + Send + Sync)) -> FieldAccessor<R> {
        entry
            .downcast_ref::<FieldAccessor<R>>()
            .expect("cache entry type is fixed by the TypeId half of its key")
            .clone()
    }
}

impl Default for AccessorCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: LazyLock<Arc<AccessorCache>> = LazyLock::new(|| Arc::new(AccessorCache::new()));

/// The process-wide accessor cache shared by all writers.
pub fn global() -> Arc<AccessorCache> {
    Arc::clone(&GLOBAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::thread;

    struct Point {
        x: i64,
        y: i64,
    }

    crate::impl_record!(Point {
        "x" => x,
        "y" => y,
    });

    #[test]
    fn test_resolve_hit_returns_published_closure() {
        let cache = AccessorCache::new();
        let first = cache.resolve::<Point>("x").unwrap();
        let second = cache.resolve::<Point>("x").unwrap();
        // Same Arc: no re-binding on the hit path.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let p = Point { x: 3, y: 4 };
        assert_eq!(first(&p).unwrap(), Value::Int64(3));
        assert_eq!(second(&p).unwrap(), Value::Int64(3));
    }

    #[test]
    fn test_distinct_fields_get_distinct_entries() {
        let cache = AccessorCache::new();
        cache.resolve::<Point>("x").unwrap();
        cache.resolve::<Point>("y").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_empty_field_name_is_configuration_error() {
        let cache = AccessorCache::new();
        let err = cache.resolve::<Point>("").err().unwrap();
        assert!(matches!(err, BindError::EmptyFieldName));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_field_is_binding_error() {
        let cache = AccessorCache::new();
        let err = cache.resolve::<Point>("z").err().unwrap();
        match err {
            BindError::UnknownField { shape, field } => {
                assert!(shape.ends_with("Point"));
                assert_eq!(field, "z");
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
        // Failed binds are not cached.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_first_use_publishes_single_winner() {
        let cache = Arc::new(AccessorCache::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.resolve::<Point>("x").unwrap())
            })
            .collect();

        let accessors: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("resolver thread panicked"))
            .collect();

        assert_eq!(cache.len(), 1);
        let p = Point { x: 7, y: 0 };
        for accessor in &accessors {
            assert_eq!(accessor(&p).unwrap(), Value::Int64(7));
        }
    }

    #[test]
    fn test_global_cache_is_shared() {
        let a = global();
        let b = global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
