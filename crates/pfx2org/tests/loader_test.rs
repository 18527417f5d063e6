// Loader round-trip tests: write a Parquet table, load it, query it.

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use pfx2org::{load_prefix_table, AttrValue, LoadError, LookupService, TableConfig};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_sample_table(path: &Path, owner_column: &str) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("prefix", DataType::Utf8, false),
        Field::new(owner_column, DataType::Utf8, true),
        Field::new("origin_asn", DataType::Int64, true),
        Field::new("rpki_status", DataType::Utf8, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![
                "216.1.81.0/24",
                "216.1.81.0/25",
                "216.1.81.0/25",
                "2001:db8::/32",
                "203.0.113.0/24",
            ])),
            Arc::new(StringArray::from(vec![
                Some("Example Corp"),
                Some("Sub Org"),
                Some("Sub Org Two"),
                Some("Example Corp"),
                None,
            ])),
            Arc::new(Int64Array::from(vec![
                Some(64500),
                Some(64501),
                Some(64502),
                None,
                Some(64510),
            ])),
            Arc::new(StringArray::from(vec![
                Some("valid"),
                Some("valid"),
                Some("unknown"),
                Some("invalid"),
                None,
            ])),
        ],
    )
    .unwrap();

    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pfx2org_sample.parquet");
    write_sample_table(&path, "Direct Owner (DO)");

    let records = load_prefix_table(&path, &TableConfig::default()).unwrap();
    assert_eq!(records.len(), 5);

    let first = &records[0];
    assert_eq!(first.prefix, "216.1.81.0/24");
    assert_eq!(first.owner.as_deref(), Some("Example Corp"));
    // Extra columns pass through typed, in schema order.
    assert_eq!(first.attrs[0].0, "origin_asn");
    assert_eq!(first.attrs[0].1, AttrValue::Int(64500));
    assert_eq!(first.attrs[1].0, "rpki_status");
    assert_eq!(first.attrs[1].1, AttrValue::String("valid".to_string()));

    // Null cells come through as Null; a null owner is None.
    assert_eq!(records[3].attr("origin_asn"), Some(&AttrValue::Null));
    assert!(records[4].owner.is_none());
}

#[test]
fn test_opener_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pfx2org_sample.parquet");
    write_sample_table(&path, "Direct Owner (DO)");

    let service = LookupService::from(&path).load().unwrap();
    assert_eq!(service.record_count(), 5);
    assert_eq!(service.prefix_count(), 4);

    // Longest-covering resolution against the loaded table.
    let entry = service.search_by_prefix("216.1.81.5/28").unwrap().unwrap();
    assert_eq!(entry.prefix(), "216.1.81.0/25");
    assert_eq!(entry.len(), 2);

    // Owner search sees exactly the rows with a non-null owner match.
    let matches = service.search_by_organization("corp");
    assert_eq!(matches.len(), 2);
}

#[test]
fn test_missing_file_is_a_load_error() {
    let err = load_prefix_table(Path::new("/nonexistent/table.parquet"), &TableConfig::default())
        .unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)), "got {:?}", err);
}

#[test]
fn test_missing_prefix_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("table.parquet");
    write_sample_table(&path, "Direct Owner (DO)");

    let config = TableConfig::default().with_prefix_column("no_such_column");
    let err = load_prefix_table(&path, &config).unwrap_err();
    assert!(
        matches!(err, LoadError::MissingColumn(ref name) if name == "no_such_column"),
        "got {:?}",
        err
    );
}

#[test]
fn test_absent_owner_column_loads_with_no_owners() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("table.parquet");
    write_sample_table(&path, "org_name");

    // Default owner column name does not exist in this table.
    let records = load_prefix_table(&path, &TableConfig::default()).unwrap();
    assert!(records.iter().all(|r| r.owner.is_none()));
    // The unrecognized column still passes through as an attribute.
    assert_eq!(
        records[0].attr("org_name"),
        Some(&AttrValue::String("Example Corp".to_string()))
    );

    // Overriding the owner column restores organization search.
    let service = LookupService::from(&path)
        .owner_column("org_name")
        .load()
        .unwrap();
    assert_eq!(service.search_by_organization("corp").len(), 2);
}

#[test]
fn test_non_string_prefix_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("table.parquet");

    let schema = Arc::new(Schema::new(vec![Field::new(
        "prefix",
        DataType::Int64,
        false,
    )]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(Int64Array::from(vec![1, 2, 3]))],
    )
    .unwrap();
    let file = File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let err = load_prefix_table(&path, &TableConfig::default()).unwrap_err();
    assert!(
        matches!(err, LoadError::BadColumnType { ref column, .. } if column == "prefix"),
        "got {:?}",
        err
    );
}

#[test]
fn test_unparseable_prefix_rows_are_dropped_by_the_service() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("table.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("prefix", DataType::Utf8, false),
        Field::new("Direct Owner (DO)", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["10.0.0.0/8", "garbage"])),
            Arc::new(StringArray::from(vec![Some("Example Corp"), Some("Ghost Org")])),
        ],
    )
    .unwrap();
    let file = File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    // The loader passes the row through; the service drops it when it
    // cannot enter the trie/index pair.
    assert_eq!(
        load_prefix_table(&path, &TableConfig::default())
            .unwrap()
            .len(),
        2
    );
    let service = LookupService::from(&path).load().unwrap();
    assert_eq!(service.record_count(), 1);
    assert!(service.search_by_organization("ghost").is_empty());
}
