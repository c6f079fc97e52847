use parquet::basic::{Compression, Encoding, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use parquet::schema::types::ColumnPath;

use crate::schema::{Schema, FORMAT_VERSION, FORMAT_VERSION_KEY, SCHEMA_METADATA_KEY};

/// Compression options for output files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// ZSTD compression (recommended, best compression ratio)
    Zstd(i32),
    /// Snappy compression (faster, slightly larger files)
    Snappy,
    /// No compression (fastest write, largest files)
    Uncompressed,
}

impl Default for CompressionType {
    fn default() -> Self {
        // ZSTD level 3 is a good balance of speed and compression
        Self::Zstd(3)
    }
}

impl CompressionType {
    /// Maximum compression (slower write, smallest files)
    pub fn max_compression() -> Self {
        Self::Zstd(22)
    }

    /// Balanced compression (recommended default)
    pub fn balanced() -> Self {
        Self::Zstd(3)
    }

    /// Fast compression (faster write, larger files)
    pub fn fast() -> Self {
        Self::Snappy
    }
}

/// Configuration for the writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Compression type to use
    pub compression: CompressionType,

    /// Data page size in bytes
    pub data_page_size: usize,

    /// Whether to write statistics for columns
    pub write_statistics: bool,

    /// Dictionary page size limit in bytes
    pub dictionary_page_size_limit: usize,

    /// Enable BYTE_STREAM_SPLIT encoding for floating-point columns.
    /// Groups bytes with similar values together (exponents, mantissas),
    /// which improves compression for correlated numeric data.
    /// Default: true
    pub use_byte_stream_split: bool,

    /// Embed the schema description and format version in the file footer
    /// as key-value metadata. Default: true
    pub embed_schema: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: CompressionType::Zstd(3),
            // 1MB data pages
            data_page_size: 1024 * 1024,
            write_statistics: true,
            // 1MB dictionary page limit
            dictionary_page_size_limit: 1024 * 1024,
            use_byte_stream_split: true,
            embed_schema: true,
        }
    }
}

impl WriterConfig {
    /// Configuration optimized for maximum compression (slower write)
    pub fn max_compression() -> Self {
        Self {
            compression: CompressionType::Zstd(22),
            data_page_size: 2 * 1024 * 1024, // 2MB pages
            write_statistics: true,
            dictionary_page_size_limit: 2 * 1024 * 1024,
            use_byte_stream_split: true,
            embed_schema: true,
        }
    }

    /// Configuration optimized for fast writing (larger files)
    pub fn fast_write() -> Self {
        Self {
            compression: CompressionType::Snappy,
            data_page_size: 512 * 1024,
            write_statistics: true,
            dictionary_page_size_limit: 512 * 1024,
            use_byte_stream_split: true,
            embed_schema: true,
        }
    }

    /// Balanced configuration (default)
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Check for option values that cannot be honored.
    ///
    /// The writer lifecycle runs this before creating the output file, so a
    /// bad configuration never produces a partial file.
    pub fn validate(&self) -> Result<(), String> {
        if let CompressionType::Zstd(level) = self.compression {
            if ZstdLevel::try_new(level).is_err() {
                return Err(format!(
                    "zstd compression level {level} is out of range (1-22)"
                ));
            }
        }
        Ok(())
    }

    /// Create writer properties from this configuration and the file schema.
    pub(crate) fn to_writer_properties(&self, schema: &Schema) -> WriterProperties {
        let compression = match self.compression {
            CompressionType::Zstd(level) => {
                // Validated by the lifecycle before it gets here; direct
                // sink users skipping validate() still get a loud fallback.
                let zstd = ZstdLevel::try_new(level).unwrap_or_else(|_| {
                    log::warn!("zstd level {level} out of range, falling back to default");
                    ZstdLevel::default()
                });
                Compression::ZSTD(zstd)
            }
            CompressionType::Snappy => Compression::SNAPPY,
            CompressionType::Uncompressed => Compression::UNCOMPRESSED,
        };

        let statistics = if self.write_statistics {
            EnabledStatistics::Chunk
        } else {
            EnabledStatistics::None
        };

        let mut builder = WriterProperties::builder()
            .set_compression(compression)
            .set_data_page_size_limit(self.data_page_size)
            .set_dictionary_page_size_limit(self.dictionary_page_size_limit)
            .set_statistics_enabled(statistics);

        // Dictionary encoding pays off for low-cardinality columns; float
        // columns are high-cardinality and compress better with
        // BYTE_STREAM_SPLIT, so dictionary is disabled there.
        for field in schema.fields() {
            let path = ColumnPath::new(vec![field.name().to_string()]);
            if field.element_type().is_float() {
                builder = builder.set_column_dictionary_enabled(path.clone(), false);
                if self.use_byte_stream_split {
                    builder = builder.set_column_encoding(path, Encoding::BYTE_STREAM_SPLIT);
                }
            } else {
                builder = builder.set_column_dictionary_enabled(path, true);
            }
        }

        if self.embed_schema {
            let mut kv_metadata = vec![KeyValue {
                key: FORMAT_VERSION_KEY.to_string(),
                value: Some(FORMAT_VERSION.to_string()),
            }];
            if let Ok(json) = serde_json::to_string(schema) {
                kv_metadata.push(KeyValue {
                    key: SCHEMA_METADATA_KEY.to_string(),
                    value: Some(json),
                });
            }
            builder = builder.set_key_value_metadata(Some(kv_metadata));
        }

        builder.build()
    }
}
