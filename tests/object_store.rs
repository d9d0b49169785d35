// Integration tests for ObjectStore against the in-memory object service

use anyhow::Result;
use cloudutils::cloud::{ErrorKind, FakeObjectIO};
use cloudutils::storage::{CONTENT_TYPE_BINARY, CONTENT_TYPE_CSV, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
use cloudutils::{DataType, ObjectStore, Source, Table};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const BUCKET: &str = "reports";

fn store() -> Result<(FakeObjectIO, ObjectStore)> {
    let io = FakeObjectIO::with_bucket(BUCKET);
    let store = ObjectStore::new(Arc::new(io.clone()), BUCKET)?;
    Ok((io, store))
}

#[test]
fn test_new_requires_existing_bucket() {
    let io = Arc::new(FakeObjectIO::new());
    assert_eq!(
        ObjectStore::new(io.clone(), "").err().map(|e| e.kind),
        Some(ErrorKind::InvalidInput)
    );
    assert_eq!(
        ObjectStore::new(io, "absent").err().map(|e| e.kind),
        Some(ErrorKind::NotFound)
    );
}

#[test]
fn test_save_sets_content_type_per_mode() -> Result<()> {
    let (io, store) = store()?;

    store.save("a.txt", Source::Text("hello".into()), DataType::Plain)?;
    store.save("b.json", Source::Json(json!({"k": [1, 2]})), DataType::Json)?;
    store.save("c.csv", Source::Text("x,y\n1,2\n".into()), DataType::Csv)?;

    assert_eq!(io.content_type(BUCKET, "a.txt").as_deref(), Some(CONTENT_TYPE_TEXT));
    assert_eq!(io.content_type(BUCKET, "b.json").as_deref(), Some(CONTENT_TYPE_JSON));
    assert_eq!(io.content_type(BUCKET, "c.csv").as_deref(), Some(CONTENT_TYPE_CSV));
    assert_eq!(store.get_json("b.json")?, json!({"k": [1, 2]}));
    assert_eq!(store.get_string("a.txt")?, "hello");
    Ok(())
}

#[test]
fn test_json_mode_rejects_non_json_text() -> Result<()> {
    let (io, store) = store()?;
    let err = store
        .save("bad.json", Source::Text("{not json".into()), DataType::Json)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(io.object_count(BUCKET), 0);

    store.save("good.json", Source::Text(r#"{"ok": true}"#.into()), DataType::Json)?;
    assert_eq!(store.get_json("good.json")?, json!({"ok": true}));
    Ok(())
}

#[test]
fn test_unsupported_source_writes_nothing() -> Result<()> {
    let (io, store) = store()?;
    let table = Table::new(["a"]).with_row(["1"]);

    let err = store.save("t.json", Source::Table(table), DataType::Json).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    let err = store.save("f", Source::Text("x".into()), DataType::Doc).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(io.object_count(BUCKET), 0);
    Ok(())
}

#[test]
fn test_table_round_trip_through_bucket() -> Result<()> {
    let (_, store) = store()?;
    let table = Table::new(["id", "label"])
        .with_row(["1", "plain"])
        .with_row(["2", "with \"quotes\", commas"]);

    store.save("tables/t.csv", Source::Table(table.clone()), DataType::Csv)?;
    let loaded = store.get_csv("tables/t.csv")?;
    assert_eq!(loaded, table);
    assert_eq!(loaded.get(1, "label"), Some("with \"quotes\", commas"));
    Ok(())
}

#[test]
fn test_doc_mode_uploads_local_file() -> Result<()> {
    let (io, store) = store()?;
    let mut file = NamedTempFile::new()?;
    file.write_all(&[0x25, 0x50, 0x44, 0x46, 0x00, 0xff])?;

    store.save("docs/contract.pdf", Source::File(file.path().to_path_buf()), DataType::Doc)?;
    assert_eq!(store.get_bytes("docs/contract.pdf")?, vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff]);
    assert_eq!(
        io.content_type(BUCKET, "docs/contract.pdf").as_deref(),
        Some(CONTENT_TYPE_BINARY)
    );

    let missing = file.path().with_extension("missing");
    let err = store
        .save("docs/missing.pdf", Source::File(missing), DataType::Doc)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
    Ok(())
}

#[test]
fn test_directories_and_listing() -> Result<()> {
    let (io, store) = store()?;

    let err = store.create_empty_directory("exports").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(io.object_count(BUCKET), 0);

    store.create_empty_directory("exports/")?;
    store.save("exports/2024.csv", Source::Text("a\n".into()), DataType::Csv)?;
    store.save("exports/summary.json", Source::Json(json!([])), DataType::Json)?;
    store.save("other/x.txt", Source::Text("x".into()), DataType::Plain)?;

    let names = store.explore_bucket(Some("exports/"))?;
    assert_eq!(names, vec!["", "2024", "summary"]);
    assert_eq!(store.explore_bucket(None)?.len(), 4);
    Ok(())
}

#[test]
fn test_delete_and_failures() -> Result<()> {
    let (io, store) = store()?;
    store.save("gone.txt", Source::Text("bye".into()), DataType::Plain)?;
    store.delete("gone.txt")?;
    assert_eq!(store.delete("gone.txt").unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(store.get_bytes("gone.txt").unwrap_err().kind, ErrorKind::NotFound);

    io.fail_next_writes([ErrorKind::Unavailable]);
    let err = store
        .save("later.txt", Source::Text("x".into()), DataType::Plain)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unavailable);
    assert_eq!(io.object_count(BUCKET), 0);
    Ok(())
}
