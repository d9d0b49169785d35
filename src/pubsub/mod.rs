//! Publish/subscribe message delivery.
//!
//! - [`publisher`] - JSON publish with the deadline-bounded retry policy
//! - [`handler`] - ack/nack strategy wrapped around user callbacks
//! - [`subscriber`] - background streaming pull returning a [`SubscriptionHandle`]

pub mod handler;
pub mod publisher;
pub mod subscriber;

pub use handler::{AckHandle, AckMode, MessageCallback, MessageHandler, MessageOutcome};
pub use publisher::Publisher;
pub use subscriber::{Subscriber, SubscriberSettings, SubscriptionHandle, SubscriptionStats};
