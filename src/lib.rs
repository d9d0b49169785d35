//! # Cloudutils
//!
//! Thin, **synchronous** wrappers around three managed cloud services: a document
//! store, an object store, and a publish/subscribe bus. Each service is reached
//! through a small transport trait so the wrappers can run against a real client or
//! the in-memory fakes shipped in [`cloud::fake`].
//!
//! ## Key Features
//!
//! - **Upserts with provenance stamps** - whitelist fields, derive a document id from
//!   key fields, stamp `write_date` and `date_input`, merge on conflict
//! - **Object storage by mode** - save text, JSON, CSV tables and local files with the
//!   right content type; read them back as bytes, text, JSON or tables
//! - **Deadline-bounded publish retries** - exponential backoff over an allow-list of
//!   transient error kinds
//! - **Ack/nack subscriber contract** - at-least-once (ack after callback) or
//!   at-most-once (ack before callback) delivery on a background pull thread
//! - **Layered configuration** - file, then `CLOUDUTILS__*` variables, then the legacy
//!   `PROJECT_ID` and `AUTH_FILE` variables
//!
//! ## Quick Start
//!
//! ```ignore
//! use cloudutils::*;
//! use cloudutils::cloud::FakePubSubIO;
//! use std::sync::Arc;
//! # fn main() -> anyhow::Result<()> {
//! let settings = config::load_config()?;
//! logging::init_from_settings(&settings);
//!
//! let bus = FakePubSubIO::new();
//! bus.create_subscription("projects/demo/topics/orders", "projects/demo/subscriptions/orders-sub");
//!
//! let publisher = Publisher::new(Arc::new(bus.clone()), "demo");
//! publisher.publish("orders", &serde_json::json!({"order": 1}))?;
//!
//! let handle = Subscriber::new(Arc::new(bus), "demo").start_subscription(
//!     "orders-sub",
//!     |payload| {
//!         println!("{payload:?}");
//!         Ok(())
//!     },
//!     AckMode::AfterCallback,
//! )?;
//! handle.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`CloudResult`]. Failures carry an [`ErrorKind`] that
//! normalizes the transport's status codes; [`ErrorKind::is_transient`] tells the
//! retry policy which of them are worth another attempt.
//!
//! ## Module Overview
//!
//! - [`cloud`] - Transport traits, error type, retry policy and in-memory fakes
//! - [`document`] - Document store upserts and queries
//! - [`storage`] - Object store reads and writes
//! - [`pubsub`] - Publisher, subscriber and the ack/nack handler
//! - [`config`] - Layered settings
//! - [`credentials`] - Credential source selection
//! - [`logging`] - `tracing` subscriber setup

pub mod cloud;
pub mod config;
pub mod credentials;
pub mod document;
pub mod logging;
pub mod pubsub;
pub mod storage;

pub use cloud::{CloudIOError, CloudResult, ErrorKind, JsonMap, RetryPolicy};
pub use crate::config::{Settings, load_config, load_config_from};
pub use credentials::Credentials;
pub use document::{DocumentStore, UpsertOutcome};
pub use pubsub::{AckMode, MessageHandler, Publisher, Subscriber, SubscriptionHandle};
pub use storage::{DataType, ObjectStore, Source, Table};
