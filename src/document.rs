//! Document store wrapper.
//!
//! [`DocumentStore`] selects documents by field equality or by id, and upserts
//! whitelisted message fields under an id derived from configured key fields.

use crate::cloud::traits::{CloudIOError, CloudResult, DocumentIO, ErrorKind, JsonMap};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Field stamped on every write.
pub const WRITE_DATE: &str = "write_date";
/// Field stamped only when a document is first created.
pub const DATE_INPUT: &str = "date_input";

const KEY_SEPARATOR: &str = "_";

/// Whether an upsert inserted a new document or merged into an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Merged,
}

pub struct DocumentStore {
    io: Arc<dyn DocumentIO>,
    stamp_date_input: bool,
}

impl DocumentStore {
    pub fn new(io: Arc<dyn DocumentIO>) -> Self {
        Self {
            io,
            stamp_date_input: true,
        }
    }

    /// Skip the `date_input` stamp on created documents.
    #[must_use]
    pub fn without_date_input(mut self) -> Self {
        self.stamp_date_input = false;
        self
    }

    /// Documents of `collection` whose fields equal every entry of `filters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub fn select_docs(&self, collection: &str, filters: &JsonMap) -> CloudResult<Vec<JsonMap>> {
        self.io.query(collection, filters)
    }

    /// The single document stored under `doc_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails
    pub fn select_by_id(&self, collection: &str, doc_id: &str) -> CloudResult<Option<JsonMap>> {
        self.io.get(collection, doc_id)
    }

    /// Insert the whitelisted fields of `message`, or merge them into the existing
    /// document when the id is already taken.
    ///
    /// The merge leaves the original `date_input` untouched and refreshes `write_date`.
    ///
    /// # Errors
    ///
    /// Returns an error if a key field is missing from the whitelisted body, or the
    /// store rejects the write for any reason other than a conflict
    pub fn upsert(
        &self,
        message: &JsonMap,
        collection: &str,
        key_fields: &[&str],
        whitelist: &[&str],
    ) -> CloudResult<UpsertOutcome> {
        let mut body = select_fields(message, whitelist);
        let doc_id = document_id(&body, key_fields)?;

        let now = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
        body.insert(WRITE_DATE.to_string(), now.clone());
        if self.stamp_date_input {
            body.insert(DATE_INPUT.to_string(), now);
        }

        match self.io.create(collection, &doc_id, body.clone()) {
            Ok(()) => {
                info!(collection, doc_id = %doc_id, "inserted document");
                Ok(UpsertOutcome::Created)
            }
            Err(err) if err.kind == ErrorKind::AlreadyExists => {
                info!(collection, doc_id = %doc_id, "existing document, merging");
                body.remove(DATE_INPUT);
                self.io.set_merge(collection, &doc_id, body)?;
                Ok(UpsertOutcome::Merged)
            }
            Err(err) => Err(err),
        }
    }
}

/// Copy of `message` restricted to `whitelist`; absent fields are skipped.
#[must_use]
pub fn select_fields(message: &JsonMap, whitelist: &[&str]) -> JsonMap {
    let mut selected = JsonMap::new();
    for &key in whitelist {
        match message.get(key) {
            Some(value) => {
                selected.insert(key.to_string(), value.clone());
            }
            None => debug!(key, "key not present"),
        }
    }
    selected
}

/// Joins the values of `key_fields` with `_`, escaping `/` as `|`.
///
/// String values are used raw; any other JSON value contributes its JSON text.
///
/// ```
/// use cloudutils::document::document_id;
/// use serde_json::json;
///
/// let body = json!({"a": "x", "b": "y/z"});
/// let id = document_id(body.as_object().unwrap(), &["a", "b"]).unwrap();
/// assert_eq!(id, "x_y|z");
/// ```
///
/// # Errors
///
/// Returns an `InvalidInput` error if `key_fields` is empty or names a field the
/// body does not carry
pub fn document_id(body: &JsonMap, key_fields: &[&str]) -> CloudResult<String> {
    if key_fields.is_empty() {
        return Err(CloudIOError::invalid_input("At least one key field is required"));
    }

    let parts = key_fields
        .iter()
        .map(|&key| {
            let value = body.get(key).ok_or_else(|| {
                CloudIOError::invalid_input(format!("Key field '{key}' missing from document"))
            })?;
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok(text.replace('/', "|"))
        })
        .collect::<CloudResult<Vec<String>>>()?;

    Ok(parts.join(KEY_SEPARATOR))
}
