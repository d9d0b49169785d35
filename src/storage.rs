//! Object store wrapper.
//!
//! [`ObjectStore`] is bound to one bucket. Uploads go through [`ObjectStore::save`],
//! whose [`DataType`] picks the content type and decides which [`Source`] shapes are
//! accepted. Every failure is logged and returned.

use crate::cloud::helpers::{IntoCloudError, validate_key_path};
use crate::cloud::traits::{CloudIOError, CloudResult, ErrorKind, ObjectIO};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

pub const CONTENT_TYPE_CSV: &str = "text/csv";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

// ============================================================================
// Payload shapes
// ============================================================================

/// Upload mode; decides the content type of the stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    Csv,
    Json,
    /// Upload the bytes of a local file
    Doc,
    #[default]
    Plain,
}

impl DataType {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => CONTENT_TYPE_CSV,
            Self::Json => CONTENT_TYPE_JSON,
            Self::Doc => CONTENT_TYPE_BINARY,
            Self::Plain => CONTENT_TYPE_TEXT,
        }
    }
}

impl FromStr for DataType {
    type Err = CloudIOError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "doc" => Ok(Self::Doc),
            "" | "plain" => Ok(Self::Plain),
            other => Err(CloudIOError::invalid_input(format!(
                "Invalid value for data type: '{other}'"
            ))),
        }
    }
}

/// Data handed to [`ObjectStore::save`]
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Text(String),
    Json(Value),
    Table(Table),
    File(PathBuf),
}

impl Source {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Json(_) => "json value",
            Self::Table(_) => "table",
            Self::File(_) => "file",
        }
    }
}

/// Tabular data with a header row, stored as CSV without an index column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Value of `column` in row `row`, if both exist
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Parse CSV text whose first record is the header
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if the CSV is malformed
    pub fn from_csv(data: &[u8]) -> CloudResult<Self> {
        let mut reader = csv::Reader::from_reader(data);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
        Ok(Self { headers, rows })
    }

    /// Render as CSV text
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if a row cannot be written
    pub fn to_csv(&self) -> CloudResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CloudIOError::new(ErrorKind::Serialization, e.to_string()))?;
        String::from_utf8(bytes).into_cloud_error(ErrorKind::Serialization)
    }
}

// ============================================================================
// ObjectStore
// ============================================================================

pub struct ObjectStore {
    io: Arc<dyn ObjectIO>,
    bucket: String,
}

impl ObjectStore {
    /// Bind to `bucket`, which must exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty bucket name and `NotFound` for a bucket
    /// the service does not know
    pub fn new(io: Arc<dyn ObjectIO>, bucket: impl Into<String>) -> CloudResult<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(CloudIOError::invalid_input("missing bucket name"));
        }
        if !io.bucket_exists(&bucket)? {
            return Err(CloudIOError::new(
                ErrorKind::NotFound,
                format!("Bucket {bucket} not found"),
            ));
        }
        Ok(Self { io, bucket })
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create an empty "directory" placeholder object.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` without writing if `path` lacks a trailing `/`, or the
    /// upload error
    pub fn create_empty_directory(&self, path: &str) -> CloudResult<()> {
        if !path.ends_with('/') {
            return Err(CloudIOError::invalid_input(format!(
                "Directory must end with a trailing slash, got: {path}"
            )));
        }
        self.upload(path, b"", CONTENT_TYPE_TEXT)
            .inspect(|_| debug!(path, "created directory"))
            .inspect_err(|err| error!(path, error = %err, "create_empty_directory failed"))
    }

    /// Delete one object.
    ///
    /// # Errors
    ///
    /// Returns the service error, e.g. `NotFound`
    pub fn delete(&self, path: &str) -> CloudResult<()> {
        self.io
            .delete_object(&self.bucket, path)
            .inspect_err(|err| error!(path, error = %err, "delete failed"))
    }

    /// Names of the objects under `prefix`: last path segment, final extension removed.
    ///
    /// # Errors
    ///
    /// Returns the listing error
    pub fn explore_bucket(&self, prefix: Option<&str>) -> CloudResult<Vec<String>> {
        let objects = self.io.list_objects(&self.bucket, prefix)?;
        Ok(objects.iter().map(|o| object_stem(&o.key)).collect())
    }

    /// Raw object bytes.
    ///
    /// # Errors
    ///
    /// Returns the download error
    pub fn get_bytes(&self, path: &str) -> CloudResult<Vec<u8>> {
        self.io.get_object(&self.bucket, path)
    }

    /// Object content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns the download error, or `Serialization` for invalid UTF-8
    pub fn get_string(&self, path: &str) -> CloudResult<String> {
        String::from_utf8(self.get_bytes(path)?).into_cloud_error(ErrorKind::Serialization)
    }

    /// Object content parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns the download error, or `Serialization` for malformed JSON
    pub fn get_json(&self, path: &str) -> CloudResult<Value> {
        Ok(serde_json::from_slice(&self.get_bytes(path)?)?)
    }

    /// Object content parsed as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns the download error, or `Serialization` for malformed CSV
    pub fn get_csv(&self, path: &str) -> CloudResult<Table> {
        Table::from_csv(&self.get_bytes(path)?)
    }

    /// Save `source` at `path` in the given mode.
    ///
    /// | mode    | accepted sources        | content type               |
    /// |---------|-------------------------|----------------------------|
    /// | `Csv`   | `Text`, `Table`         | `text/csv`                 |
    /// | `Json`  | `Json`, `Text` (if JSON)| `application/json`         |
    /// | `Doc`   | `File`                  | `application/octet-stream` |
    /// | `Plain` | `Text`, `Json`          | `text/plain`               |
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` without writing for an unsupported source or a text
    /// that is not JSON in `Json` mode, `Io` for an unreadable local file, or the
    /// upload error
    pub fn save(&self, path: &str, source: Source, mode: DataType) -> CloudResult<()> {
        encode(source, mode)
            .and_then(|data| self.upload(path, &data, mode.content_type()))
            .inspect(|_| debug!(path, ?mode, "saved object"))
            .inspect_err(|err| error!(path, ?mode, error = %err, "save failed"))
    }

    fn upload(&self, path: &str, data: &[u8], content_type: &str) -> CloudResult<()> {
        validate_key_path(path)?;
        self.io.put_object(&self.bucket, path, data, content_type)
    }
}

fn encode(source: Source, mode: DataType) -> CloudResult<Vec<u8>> {
    match (mode, source) {
        (DataType::Csv, Source::Text(text)) | (DataType::Plain, Source::Text(text)) => {
            Ok(text.into_bytes())
        }
        (DataType::Csv, Source::Table(table)) => Ok(table.to_csv()?.into_bytes()),
        (DataType::Json, Source::Json(value)) | (DataType::Plain, Source::Json(value)) => {
            Ok(serde_json::to_vec(&value)?)
        }
        (DataType::Json, Source::Text(text)) => {
            if serde_json::from_str::<Value>(&text).is_err() {
                return Err(CloudIOError::invalid_input(
                    "Invalid JSON. No file has been saved.",
                ));
            }
            Ok(text.into_bytes())
        }
        (DataType::Doc, Source::File(file)) => read_local_file(&file),
        (mode, source) => Err(CloudIOError::invalid_input(format!(
            "Cannot save a {} in {mode:?} mode",
            source.shape()
        ))),
    }
}

fn read_local_file(file: &Path) -> CloudResult<Vec<u8>> {
    std::fs::read(file).map_err(|e| CloudIOError::from(e).with_context(file.display().to_string()))
}

/// Last segment of an object key with its final extension stripped.
///
/// Leading dots belong to the name, so `.hidden` and `..x` have no extension.
fn object_stem(key: &str) -> String {
    let name = key.rsplit('/').next().unwrap_or(key);
    let dots = name.len() - name.trim_start_matches('.').len();
    match name[dots..].rfind('.') {
        Some(idx) => name[..dots + idx].to_string(),
        None => name.to_string(),
    }
}
