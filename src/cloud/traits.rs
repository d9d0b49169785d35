//! Core traits for cloud IO operations.
//!
//! These traits provide synchronous interfaces for the three managed services wrapped
//! by this crate. Provider bindings implement them; [`crate::cloud::fake`] implements
//! them in memory.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// Core Error Type
// ============================================================================

/// Generic error type for cloud IO operations
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}{}", context_suffix(.context.as_deref()))]
pub struct CloudIOError {
    pub message: String,
    pub kind: ErrorKind,
    pub context: Option<String>,
}

/// Failure classes, modelled on the canonical status codes returned by managed services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    InvalidInput,
    Aborted,
    DeadlineExceeded,
    Internal,
    ResourceExhausted,
    Unavailable,
    Unknown,
    Cancelled,
    Serialization,
    Io,
    Callback,
}

impl ErrorKind {
    /// Kinds that the default publish policy retries.
    pub const TRANSIENT: [Self; 7] = [
        Self::Aborted,
        Self::DeadlineExceeded,
        Self::Internal,
        Self::ResourceExhausted,
        Self::Unavailable,
        Self::Unknown,
        Self::Cancelled,
    ];

    #[must_use]
    pub fn is_transient(self) -> bool {
        Self::TRANSIENT.contains(&self)
    }
}

impl CloudIOError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }
}

impl From<serde_json::Error> for CloudIOError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Serialization, err.to_string())
    }
}

impl From<std::io::Error> for CloudIOError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, err.to_string())
    }
}

impl From<csv::Error> for CloudIOError {
    fn from(err: csv::Error) -> Self {
        Self::new(ErrorKind::Serialization, err.to_string())
    }
}

fn context_suffix(context: Option<&str>) -> String {
    context.map(|c| format!(" ({c})")).unwrap_or_default()
}

pub type CloudResult<T> = Result<T, CloudIOError>;

/// A JSON object with string keys, the shape of every document and message payload.
pub type JsonMap = serde_json::Map<String, Value>;

// ============================================================================
// ObjectIO - Object Storage
// ============================================================================

/// Metadata for an object in storage
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<i64>, // Unix timestamp
}

/// Trait for object storage operations
pub trait ObjectIO: Send + Sync {
    /// Upload data to object storage with the given content type
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket doesn't exist, permissions are not enough, or the upload fails
    fn put_object(&self, bucket: &str, key: &str, data: &[u8], content_type: &str)
    -> CloudResult<()>;

    /// Download data from object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist, permissions are not enough, or the download fails
    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;

    /// Delete an object
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist, permissions are not enough, or the deletion fails
    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()>;

    /// List objects with a prefix
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket doesn't exist, permissions are not enough, or the listing fails
    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>>;

    /// Check if a bucket exists
    ///
    /// # Errors
    ///
    /// Returns an error if there's a connection issue or permissions are not enough
    fn bucket_exists(&self, bucket: &str) -> CloudResult<bool>;
}

// ============================================================================
// DocumentIO - Document Databases
// ============================================================================

/// Trait for document store operations
pub trait DocumentIO: Send + Sync {
    /// Create a document; fails with [`ErrorKind::AlreadyExists`] if the id is taken
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists, permissions are not enough, or the write fails
    fn create(&self, collection: &str, id: &str, data: JsonMap) -> CloudResult<()>;

    /// Merge fields into a document, creating it if absent
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the write fails
    fn set_merge(&self, collection: &str, id: &str, data: JsonMap) -> CloudResult<()>;

    /// Get a document by id
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the read fails
    fn get(&self, collection: &str, id: &str) -> CloudResult<Option<JsonMap>>;

    /// Query documents whose fields equal every given filter value
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the query fails
    fn query(&self, collection: &str, filters: &JsonMap) -> CloudResult<Vec<JsonMap>>;
}

// ============================================================================
// PubSubIO - Message Streaming
// ============================================================================

/// A message delivered to a subscription
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub id: String,
    pub ack_id: String,
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub publish_time: Option<i64>, // Unix timestamp
    pub delivery_attempt: u32,
}

/// Trait for pub/sub streaming operations
pub trait PubSubIO: Send + Sync {
    /// Publish a message to a topic, returning the id the bus assigned
    ///
    /// # Errors
    ///
    /// Returns an error if the topic doesn't exist, permissions are not enough, or publishing fails
    fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: HashMap<String, String>,
    ) -> CloudResult<String>;

    /// Pull up to `max_messages` outstanding messages from a subscription
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription doesn't exist, permissions are not enough, or pulling fails
    fn pull(&self, subscription: &str, max_messages: u32) -> CloudResult<Vec<ReceivedMessage>>;

    /// Acknowledge messages (mark as processed)
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription doesn't exist, acknowledgment IDs are invalid, or the operation fails
    fn acknowledge(&self, subscription: &str, ack_ids: &[String]) -> CloudResult<()>;

    /// Negatively acknowledge messages, requesting redelivery
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription doesn't exist, acknowledgment IDs are invalid, or the operation fails
    fn negative_acknowledge(&self, subscription: &str, ack_ids: &[String]) -> CloudResult<()>;
}
