use crate::cloud::helpers::topic_path;
use crate::cloud::retry::{RetryPolicy, retry_with_backoff};
use crate::cloud::traits::{CloudIOError, CloudResult, PubSubIO};
use crate::config::Settings;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Publishes JSON payloads to topics of one project.
///
/// Every publish blocks until the bus accepts the message, the retry policy meets a
/// non-retryable failure, or the policy deadline runs out.
pub struct Publisher {
    io: Arc<dyn PubSubIO>,
    project_id: String,
    retry: RetryPolicy,
}

impl Publisher {
    pub fn new(io: Arc<dyn PubSubIO>, project_id: impl Into<String>) -> Self {
        Self {
            io,
            project_id: project_id.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Publisher for the configured project with the configured retry timings
    pub fn from_settings(io: Arc<dyn PubSubIO>, settings: &Settings) -> Self {
        Self::new(io, settings.project.project_id.clone())
            .with_retry_policy(settings.pubsub.retry.to_policy())
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// # Errors
    ///
    /// Returns an error if the project id is empty or the topic name is invalid
    pub fn topic_path(&self, topic_id: &str) -> CloudResult<String> {
        topic_path(&self.project_id, topic_id)
    }

    /// Serialize `payload` as a UTF-8 JSON object and publish it, returning the
    /// message id.
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if the payload cannot be encoded, `InvalidInput`
    /// without publishing if it does not encode to a JSON object, the first
    /// non-retryable failure, or the last transient failure once the deadline is spent
    pub fn publish<T: Serialize + ?Sized>(&self, topic_id: &str, payload: &T) -> CloudResult<String> {
        self.publish_with_attributes(topic_id, payload, &HashMap::new())
    }

    /// Like [`Publisher::publish`], attaching string attributes to the message.
    ///
    /// # Errors
    ///
    /// See [`Publisher::publish`]
    pub fn publish_with_attributes<T: Serialize + ?Sized>(
        &self,
        topic_id: &str,
        payload: &T,
        attributes: &HashMap<String, String>,
    ) -> CloudResult<String> {
        let path = self.topic_path(topic_id)?;
        let data = encode_object(payload)?;

        let message_id = retry_with_backoff(&self.retry, || {
            self.io.publish(&path, &data, attributes.clone())
        })?;

        info!(topic = %path, message_id = %message_id, "published message");
        Ok(message_id)
    }

    /// Publish each payload in order; stops at the first payload that fails.
    ///
    /// # Errors
    ///
    /// See [`Publisher::publish`]
    pub fn publish_batch<T: Serialize>(
        &self,
        topic_id: &str,
        payloads: &[T],
    ) -> CloudResult<Vec<String>> {
        payloads
            .iter()
            .map(|payload| self.publish(topic_id, payload))
            .collect()
    }
}

/// Subscribers only settle JSON objects, so anything else is refused up front.
fn encode_object<T: Serialize + ?Sized>(payload: &T) -> CloudResult<Vec<u8>> {
    match serde_json::to_value(payload)? {
        object @ Value::Object(_) => Ok(serde_json::to_vec(&object)?),
        other => Err(CloudIOError::invalid_input(format!(
            "message payload must be a JSON object, got: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::fake::FakePubSubIO;
    use crate::cloud::traits::ErrorKind;
    use serde_json::json;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_delays(Duration::from_millis(1), Duration::from_millis(4))
            .with_deadline(Duration::from_secs(2))
    }

    fn setup() -> (FakePubSubIO, Publisher) {
        let bus = FakePubSubIO::new();
        bus.create_topic("projects/p/topics/events");
        let publisher =
            Publisher::new(Arc::new(bus.clone()), "p").with_retry_policy(fast_policy());
        (bus, publisher)
    }

    #[test]
    fn test_publish_encodes_utf8_json() {
        let (bus, publisher) = setup();
        let id = publisher
            .publish("events", &json!({"city": "Zürich", "n": 1}))
            .unwrap();
        assert_eq!(id, "msg-1");

        let published = bus.published("projects/p/topics/events");
        assert_eq!(published.len(), 1);
        let decoded: serde_json::Value = serde_json::from_slice(&published[0]).unwrap();
        assert_eq!(decoded, json!({"city": "Zürich", "n": 1}));
    }

    #[test]
    fn test_publish_retries_transient_kinds() {
        let (bus, publisher) = setup();
        bus.fail_next_publishes([
            ErrorKind::Unavailable,
            ErrorKind::Aborted,
            ErrorKind::ResourceExhausted,
        ]);

        publisher.publish("events", &json!({"a": 1})).unwrap();
        assert_eq!(bus.publish_attempts(), 4);
    }

    #[test]
    fn test_publish_permanent_failure_single_attempt() {
        let (bus, publisher) = setup();
        bus.fail_next_publishes([ErrorKind::PermissionDenied]);

        let err = publisher.publish("events", &json!({"a": 1})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert_eq!(bus.publish_attempts(), 1);
        assert!(bus.published("projects/p/topics/events").is_empty());
    }

    #[test]
    fn test_publish_rejects_non_object_payloads() {
        let (bus, publisher) = setup();
        for payload in [json!(42), json!("text"), json!([1, 2]), json!(null)] {
            let err = publisher.publish("events", &payload).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidInput);
        }
        assert_eq!(bus.publish_attempts(), 0);
        assert!(bus.published("projects/p/topics/events").is_empty());
    }

    #[test]
    fn test_publish_serializes_structs() {
        #[derive(Serialize)]
        struct Order {
            id: u32,
            sku: &'static str,
        }

        let (bus, publisher) = setup();
        publisher
            .publish("events", &Order { id: 9, sku: "A-1" })
            .unwrap();
        assert_eq!(
            bus.published("projects/p/topics/events")[0],
            br#"{"id":9,"sku":"A-1"}"#
        );
    }

    #[test]
    fn test_publish_batch_in_order() {
        let (bus, publisher) = setup();
        let ids = publisher
            .publish_batch("events", &[json!({"i": 0}), json!({"i": 1})])
            .unwrap();
        assert_eq!(ids, vec!["msg-1", "msg-2"]);
        assert_eq!(bus.published("projects/p/topics/events")[1], br#"{"i":1}"#);
    }
}
