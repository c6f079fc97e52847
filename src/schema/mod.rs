//! # Columnar schema definition
//!
//! A [`Schema`] is an ordered sequence of [`FieldDescriptor`]s. Order is
//! significant: a field's position in the sequence is the position of its
//! column in every committed row group. Names are unique within a schema and
//! a schema always has at least one field — both invariants are enforced at
//! construction, so downstream code never re-validates them.
//!
//! Schemas are immutable once built and serde-serializable; the writer embeds
//! the JSON rendering in the Parquet footer under [`SCHEMA_METADATA_KEY`] so
//! files are self-describing without rowpack tooling.
//!
//! ## Element types
//!
//! | Element type | Arrow type | Parquet physical type |
//! |--------------|------------|-----------------------|
//! | Bool | Boolean | BOOLEAN |
//! | Int32 | Int32 | INT32 |
//! | Int64 | Int64 | INT64 |
//! | Float32 | Float32 | FLOAT |
//! | Float64 | Float64 | DOUBLE |
//! | Utf8 | Utf8 | BYTE_ARRAY (UTF8) |
//! | Binary | Binary | BYTE_ARRAY |

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef};
use serde::{Deserialize, Serialize};


/// Footer key under which the JSON-rendered [`Schema`] is embedded.
pub const SCHEMA_METADATA_KEY: &str = "rowpack:schema";

/// Footer key carrying the rowpack format version.
pub const FORMAT_VERSION_KEY: &str = "rowpack:format_version";

/// Version string written to every file footer.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Semantic element type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// Boolean column.
    Bool,
    /// 32-bit signed integer column.
    Int32,
    /// 64-bit signed integer column.
    Int64,
    /// 32-bit float column.
    Float32,
    /// 64-bit float column.
    Float64,
    /// UTF-8 string column.
    Utf8,
    /// Byte-array column.
    Binary,
}

impl ElementType {
    /// Arrow data type this element type maps to.
    pub fn arrow_type(&self) -> DataType {
        match self {
            ElementType::Bool => DataType::Boolean,
            ElementType::Int32 => DataType::Int32,
            ElementType::Int64 => DataType::Int64,
            ElementType::Float32 => DataType::Float32,
            ElementType::Float64 => DataType::Float64,
            ElementType::Utf8 => DataType::Utf8,
            ElementType::Binary => DataType::Binary,
        }
    }

    /// Whether values of this type are floating point. Float columns get
    /// different Parquet encoding defaults (see `WriterConfig`).
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

/// Metadata for one column: name, element type, nullability.
///
/// Position is not stored on the descriptor; it is the descriptor's index in
/// its [`Schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    element_type: ElementType,
    #[serde(default)]
    nullable: bool,
}

impl FieldDescriptor {
    /// A required (non-nullable) field.
    pub fn new(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
            nullable: false,
        }
    }

    /// A nullable field.
    pub fn nullable(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
            nullable: true,
        }
    }

    /// Field name; unique within its schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared element type.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Whether the column accepts null values.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Arrow rendering of this field.
    pub fn to_arrow(&self) -> Field {
        Field::new(&self.name, self.element_type.arrow_type(), self.nullable)
    }
}

/// Errors from schema construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// A schema must contain at least one field.
    #[error("schema has no fields")]
    Empty,

    /// Two fields share a name.
    #[error("duplicate field name: '{0}'")]
    DuplicateField(String),

    /// A field was declared with an empty name.
    #[error("field at position {0} has an empty name")]
    EmptyFieldName(usize),
}

/// An ordered, validated set of field descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldDescriptor>", into = "Vec<FieldDescriptor>")]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Build a schema from descriptors, validating the invariants.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Empty`] for zero fields, [`SchemaError::EmptyFieldName`]
    /// for a nameless field, [`SchemaError::DuplicateField`] for a repeated
    /// name.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (position, field) in fields.iter().enumerate() {
            if field.name().is_empty() {
                return Err(SchemaError::EmptyFieldName(position));
            }
            if fields[..position].iter().any(|f| f.name() == field.name()) {
                return Err(SchemaError::DuplicateField(field.name().to_owned()));
            }
        }
        Ok(Self { fields })
    }

    /// Start a fluent builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// The descriptors, in column order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false — an empty schema is unconstructible — but kept so
    /// `len`/`is_empty` pair up for callers.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Column position of the named field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Arrow rendering of the whole schema, fields in column order.
    pub fn to_arrow(&self) -> SchemaRef {
        Arc::new(ArrowSchema::new(
            self.fields
                .iter()
                .map(FieldDescriptor::to_arrow)
                .collect::<Vec<_>>(),
        ))
    }
}

impl TryFrom<Vec<FieldDescriptor>> for Schema {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldDescriptor>) -> Result<Self, Self::Error> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<FieldDescriptor> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

/// Fluent construction for [`Schema`].
///
/// ```rust
/// use rowpack::schema::{ElementType, Schema};
///
/// let schema = Schema::builder()
///     .field("id", ElementType::Int64)
///     .field("name", ElementType::Utf8)
///     .nullable_field("age", ElementType::Int32)
///     .build()
///     .unwrap();
/// assert_eq!(schema.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a required field.
    pub fn field(mut self, name: impl Into<String>, element_type: ElementType) -> Self {
        self.fields.push(FieldDescriptor::new(name, element_type));
        self
    }

    /// Append a nullable field.
    pub fn nullable_field(mut self, name: impl Into<String>, element_type: ElementType) -> Self {
        self.fields
            .push(FieldDescriptor::nullable(name, element_type));
        self
    }

    /// Validate and produce the schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::new(self.fields)
    }
}
