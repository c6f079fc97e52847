//! End-to-end tests: write batches through the full stack, read the file
//! back with the Arrow Parquet reader, and check rows and metadata.

use std::fs::File;
use std::sync::Arc;

use arrow::array::{Array, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tempfile::tempdir;

use rowpack::prelude::*;
use rowpack::schema::{FORMAT_VERSION, FORMAT_VERSION_KEY, SCHEMA_METADATA_KEY};

#[derive(Clone)]
struct Person {
    id: i64,
    name: String,
    height: f64,
    active: bool,
    nickname: Option<String>,
}

rowpack::impl_record!(Person {
    "id" => id,
    "name" => name,
    "height" => height,
    "active" => active,
    "nickname" => nickname,
});

fn person_schema() -> Schema {
    Schema::builder()
        .field("id", ElementType::Int64)
        .field("name", ElementType::Utf8)
        .field("height", ElementType::Float64)
        .field("active", ElementType::Bool)
        .nullable_field("nickname", ElementType::Utf8)
        .build()
        .unwrap()
}

fn sample_people() -> Vec<Person> {
    vec![
        Person {
            id: 1,
            name: "Alice".to_string(),
            height: 1.70,
            active: true,
            nickname: Some("Al".to_string()),
        },
        Person {
            id: 2,
            name: "Bob".to_string(),
            height: 1.82,
            active: false,
            nickname: None,
        },
    ]
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn read_all(path: &std::path::Path) -> Vec<RecordBatch> {
    let file = File::open(path).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    reader.collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn test_roundtrip_single_batch() {
    init_logs();
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.parquet");

    let mut writer =
        RowPackWriter::create(&path, person_schema(), WriterConfig::default()).unwrap();
    writer.write_row_group(&sample_people()).unwrap();
    let stats = writer.close().unwrap().unwrap();
    assert_eq!(stats.rows_written, 2);
    assert_eq!(stats.row_groups_written, 1);

    let batches = read_all(&path);
    let batch = arrow::compute::concat_batches(&batches[0].schema(), &batches).unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 5);

    let ids = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.values(), &[1, 2]);

    let names = batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(names.value(0), "Alice");
    assert_eq!(names.value(1), "Bob");

    let heights = batch
        .column(2)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(heights.value(0), 1.70);
    assert_eq!(heights.value(1), 1.82);

    let active = batch
        .column(3)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(active.value(0));
    assert!(!active.value(1));

    let nicknames = batch
        .column(4)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(nicknames.value(0), "Al");
    assert!(nicknames.is_null(1));
}

#[test]
fn test_each_batch_becomes_one_row_group() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("groups.parquet");

    let schema = Schema::builder()
        .field("id", ElementType::Int64)
        .field("name", ElementType::Utf8)
        .field("height", ElementType::Float64)
        .field("active", ElementType::Bool)
        .nullable_field("nickname", ElementType::Utf8)
        .build()
        .unwrap();

    let mut writer = RowPackWriter::create(&path, schema, WriterConfig::fast_write()).unwrap();
    for size in [3, 1, 4] {
        let batch: Vec<Person> = (0..size)
            .map(|i| Person {
                id: i,
                name: format!("p{i}"),
                height: 1.0 + i as f64 / 100.0,
                active: i % 2 == 0,
                nickname: None,
            })
            .collect();
        writer.write_row_group(&batch).unwrap();
    }
    let stats = writer.close().unwrap().unwrap();
    assert_eq!(stats.rows_written, 8);
    assert_eq!(stats.row_groups_written, 3);

    let file = File::open(&path).unwrap();
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
    let row_groups = builder.metadata().row_groups();
    assert_eq!(row_groups.len(), 3);
    assert_eq!(
        row_groups.iter().map(|rg| rg.num_rows()).collect::<Vec<_>>(),
        vec![3, 1, 4]
    );
}

#[test]
fn test_failed_batch_leaves_file_valid_and_retryable() {
    init_logs();

    #[derive(Clone)]
    struct Reading {
        tag: String,
        value: Option<f64>,
    }

    rowpack::impl_record!(Reading {
        "tag" => tag,
        "value" => value,
    });

    let dir = tempdir().unwrap();
    let path = dir.path().join("readings.parquet");

    // "value" is declared required; a None in the batch fails extraction.
    let schema = Schema::builder()
        .field("tag", ElementType::Utf8)
        .field("value", ElementType::Float64)
        .build()
        .unwrap();

    let mut writer = RowPackWriter::create(&path, schema, WriterConfig::default()).unwrap();
    writer
        .write_row_group(&[Reading {
            tag: "ok".to_string(),
            value: Some(1.0),
        }])
        .unwrap();

    let bad = vec![
        Reading {
            tag: "good".to_string(),
            value: Some(2.0),
        },
        Reading {
            tag: "bad".to_string(),
            value: None,
        },
    ];
    let err = writer.write_row_group(&bad).unwrap_err();
    assert!(matches!(err, WriteError::Materialize(_)));

    // Fix the batch and retry on the same writer.
    let fixed: Vec<Reading> = bad
        .into_iter()
        .map(|mut r| {
            r.value.get_or_insert(0.0);
            r
        })
        .collect();
    writer.write_row_group(&fixed).unwrap();

    let stats = writer.close().unwrap().unwrap();
    assert_eq!(stats.rows_written, 3);
    assert_eq!(stats.row_groups_written, 2);

    let batches = read_all(&path);
    let total: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(total, 3);
}

#[test]
fn test_footer_metadata_describes_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("meta.parquet");

    let schema = person_schema();
    let mut writer = RowPackWriter::create(&path, schema.clone(), WriterConfig::default()).unwrap();
    writer.write_row_group(&sample_people()).unwrap();
    writer.close().unwrap();

    let file = File::open(&path).unwrap();
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
    let kv = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .expect("footer key-value metadata");

    let version = kv
        .iter()
        .find(|e| e.key == FORMAT_VERSION_KEY)
        .and_then(|e| e.value.as_deref())
        .expect("format version entry");
    assert_eq!(version, FORMAT_VERSION);

    let embedded = kv
        .iter()
        .find(|e| e.key == SCHEMA_METADATA_KEY)
        .and_then(|e| e.value.as_deref())
        .expect("schema entry");
    let recovered: Schema = serde_json::from_str(embedded).unwrap();
    assert_eq!(recovered, schema);
}

#[test]
fn test_compression_presets_all_produce_readable_files() {
    let dir = tempdir().unwrap();
    for (name, config) in [
        ("max", WriterConfig::max_compression()),
        ("fast", WriterConfig::fast_write()),
        ("balanced", WriterConfig::balanced()),
        (
            "uncompressed",
            WriterConfig {
                compression: CompressionType::Uncompressed,
                ..WriterConfig::default()
            },
        ),
    ] {
        let path = dir.path().join(format!("{name}.parquet"));
        let mut writer = RowPackWriter::create(&path, person_schema(), config).unwrap();
        writer.write_row_group(&sample_people()).unwrap();
        writer.close().unwrap();

        let batches = read_all(&path);
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 2, "preset {name}");
    }
}

#[test]
fn test_shared_accessor_cache_across_writers() {
    // Two writers over the same record type reuse the process-wide cache;
    // Arc identity of resolved accessors proves no rebinding happened.
    let cache = rowpack::accessor::global();
    let before = cache.len();
    let a: rowpack::record::FieldAccessor<Person> = cache.resolve("id").unwrap();

    let dir = tempdir().unwrap();
    for name in ["one.parquet", "two.parquet"] {
        let path = dir.path().join(name);
        let mut writer =
            RowPackWriter::create(&path, person_schema(), WriterConfig::default()).unwrap();
        writer.write_row_group(&sample_people()).unwrap();
        writer.close().unwrap();
    }

    let after: rowpack::record::FieldAccessor<Person> = cache.resolve("id").unwrap();
    assert!(Arc::ptr_eq(&a, &after));
    // Only the Person fields were added, once each.
    assert!(cache.len() >= before);
}
