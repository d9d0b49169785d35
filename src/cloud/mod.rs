//! Cloud I/O abstractions for the managed services this crate wraps.
//!
//! Each trait represents one category of cloud service and comes with:
//!
//! - **Synchronous interface** - All operations are blocking; provider bindings can
//!   use an async runtime internally but expose a blocking interface.
//! - **Fake implementations** - In-memory implementations for unit testing without
//!   external dependencies
//! - **Retry** - a deadline-bounded exponential backoff policy for transient failures
//!
//! ## Available Cloud Service Traits
//!
//! - [`ObjectIO`] - Object storage (GCS, S3, Azure Blob)
//! - [`DocumentIO`] - Document stores (`Firestore`, `DynamoDB`, Cosmos DB)
//! - [`PubSubIO`] - Pub/sub messaging (Cloud Pub/Sub, Kafka, Kinesis)
//!
//! ## Usage Patterns
//!
//! ### Unit Testing with Fakes
//! ```
//! use cloudutils::cloud::*;
//!
//! # fn main() -> CloudResult<()> {
//! let storage = FakeObjectIO::with_bucket("bucket");
//! storage.put_object("bucket", "key", b"data", "text/plain")?;
//!
//! let objects = storage.list_objects("bucket", None)?;
//! assert_eq!(objects.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`CloudResult<T>`] where the error is [`CloudIOError`].
//! Errors are categorized by [`ErrorKind`]; [`ErrorKind::is_transient`] separates the
//! kinds worth retrying (`Aborted`, `DeadlineExceeded`, `Internal`,
//! `ResourceExhausted`, `Unavailable`, `Unknown`, `Cancelled`) from permanent ones.
//!
//! ## Module Structure
//!
//! - [`traits`] - Core trait definitions and types
//! - [`fake`] - In-memory fake implementations for testing
//! - [`retry`] - Retry policy and backoff loop
//! - [`helpers`] - Resource paths and validation

pub mod fake;
pub mod helpers;
pub mod retry;
pub mod traits;

pub use fake::*;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use traits::*;
