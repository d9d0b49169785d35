//! Fake implementations for testing.
//!
//! These implementations use in-memory data structures to simulate cloud services,
//! making them ideal for unit testing without external dependencies. Each fake can be
//! told to fail upcoming calls with a chosen [`ErrorKind`] to exercise error paths.

use crate::cloud::traits::{
    CloudIOError, CloudResult, DocumentIO, ErrorKind, JsonMap, ObjectIO, ObjectMetadata, PubSubIO,
    ReceivedMessage,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

// Type aliases for complex nested types
type BucketStorage = Arc<Mutex<HashMap<String, HashMap<String, StoredObject>>>>;
type CollectionStorage = Arc<Mutex<HashMap<String, HashMap<String, JsonMap>>>>;
type FailureQueue = Arc<Mutex<VecDeque<ErrorKind>>>;

fn next_failure(queue: &FailureQueue, operation: &str) -> CloudResult<()> {
    let kind = queue.lock().expect("failure queue mutex poisoned").pop_front();
    kind.map_or(Ok(()), |kind| {
        Err(CloudIOError::new(kind, format!("injected {kind:?} failure on {operation}")))
    })
}

// ============================================================================
// FakeObjectIO
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeObjectIO {
    storage: BucketStorage,
    write_failures: FailureQueue,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake with one empty bucket already created
    #[must_use]
    pub fn with_bucket(bucket: &str) -> Self {
        let fake = Self::new();
        fake.create_bucket(bucket);
        fake
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default();
    }

    /// Make the next uploads or deletes fail, one injected kind per call
    pub fn fail_next_writes(&self, kinds: impl IntoIterator<Item = ErrorKind>) {
        self.write_failures
            .lock()
            .expect("failure queue mutex poisoned")
            .extend(kinds);
    }

    #[must_use]
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.content_type.clone())
    }

    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage.get(bucket).map_or(0, HashMap::len)
    }
}

impl ObjectIO for FakeObjectIO {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> CloudResult<()> {
        next_failure(&self.write_failures, "put_object")?;
        let mut storage = self.storage.lock().expect("storage mutex poisoned");
        let bucket_map = storage.get_mut(bucket).ok_or_else(|| {
            CloudIOError::new(ErrorKind::NotFound, format!("Bucket {bucket} not found"))
        })?;
        bucket_map.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        drop(storage);
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.data.clone())
            .ok_or_else(|| {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Object {bucket}/{key} not found"),
                )
            })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        next_failure(&self.write_failures, "delete_object")?;
        let removed = self
            .storage
            .lock()
            .expect("storage mutex poisoned")
            .get_mut(bucket)
            .and_then(|b| b.remove(key));
        removed.map(|_| ()).ok_or_else(|| {
            CloudIOError::new(
                ErrorKind::NotFound,
                format!("Object {bucket}/{key} not found"),
            )
        })
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        let bucket_map = storage.get(bucket).ok_or_else(|| {
            CloudIOError::new(ErrorKind::NotFound, format!("Bucket {bucket} not found"))
        })?;

        let mut objects: Vec<ObjectMetadata> = bucket_map
            .iter()
            .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
            .map(|(key, object)| ObjectMetadata {
                key: key.clone(),
                size: object.data.len() as u64,
                content_type: Some(object.content_type.clone()),
                last_modified: Some(0),
            })
            .collect();

        drop(storage);
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn bucket_exists(&self, bucket: &str) -> CloudResult<bool> {
        Ok(self
            .storage
            .lock()
            .expect("storage mutex poisoned")
            .contains_key(bucket))
    }
}

// ============================================================================
// FakeDocumentIO
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeDocumentIO {
    collections: CollectionStorage,
    write_failures: FailureQueue,
}

impl FakeDocumentIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next creates or merges fail, one injected kind per call
    pub fn fail_next_writes(&self, kinds: impl IntoIterator<Item = ErrorKind>) {
        self.write_failures
            .lock()
            .expect("failure queue mutex poisoned")
            .extend(kinds);
    }

    #[must_use]
    pub fn document_count(&self, collection: &str) -> usize {
        let collections = self.collections.lock().expect("collections mutex poisoned");
        collections.get(collection).map_or(0, HashMap::len)
    }
}

impl DocumentIO for FakeDocumentIO {
    fn create(&self, collection: &str, id: &str, data: JsonMap) -> CloudResult<()> {
        next_failure(&self.write_failures, "create")?;
        let mut collections = self.collections.lock().expect("collections mutex poisoned");
        let coll = collections.entry(collection.to_string()).or_default();
        if coll.contains_key(id) {
            return Err(CloudIOError::new(
                ErrorKind::AlreadyExists,
                format!("Document {collection}/{id} already exists"),
            ));
        }
        coll.insert(id.to_string(), data);
        drop(collections);
        Ok(())
    }

    fn set_merge(&self, collection: &str, id: &str, data: JsonMap) -> CloudResult<()> {
        next_failure(&self.write_failures, "set_merge")?;
        let mut collections = self.collections.lock().expect("collections mutex poisoned");
        let doc = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        doc.extend(data);
        drop(collections);
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> CloudResult<Option<JsonMap>> {
        let collections = self.collections.lock().expect("collections mutex poisoned");
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    fn query(&self, collection: &str, filters: &JsonMap) -> CloudResult<Vec<JsonMap>> {
        let collections = self.collections.lock().expect("collections mutex poisoned");
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut ids: Vec<&String> = coll
            .iter()
            .filter(|(_, doc)| filters.iter().all(|(k, v)| doc.get(k) == Some(v)))
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        let results = ids.into_iter().map(|id| coll[id].clone()).collect();

        drop(collections);
        Ok(results)
    }
}

// ============================================================================
// FakePubSubIO
// ============================================================================

/// How often the fake saw each message acknowledged and negatively acknowledged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckRecord {
    pub acks: u32,
    pub nacks: u32,
}

#[derive(Default)]
struct PubSubState {
    // topic path -> subscription paths bound to it
    topics: HashMap<String, Vec<String>>,
    queues: HashMap<String, VecDeque<ReceivedMessage>>,
    outstanding: HashMap<String, (String, ReceivedMessage)>,
    published: HashMap<String, Vec<Vec<u8>>>,
    acks: HashMap<String, AckRecord>,
    message_counter: u64,
    delivery_counter: u64,
    publish_attempts: u64,
}

#[derive(Clone, Default)]
pub struct FakePubSubIO {
    state: Arc<Mutex<PubSubState>>,
    publish_failures: FailureQueue,
    pull_failures: FailureQueue,
}

impl FakePubSubIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PubSubState> {
        self.state.lock().expect("pubsub state mutex poisoned")
    }

    pub fn create_topic(&self, topic: &str) {
        self.lock().topics.entry(topic.to_string()).or_default();
    }

    /// Bind a subscription to a topic, creating the topic if needed
    pub fn create_subscription(&self, topic: &str, subscription: &str) {
        let mut state = self.lock();
        let subs = state.topics.entry(topic.to_string()).or_default();
        if !subs.iter().any(|s| s == subscription) {
            subs.push(subscription.to_string());
        }
        state.queues.entry(subscription.to_string()).or_default();
    }

    /// Make the next publishes fail, one injected kind per attempt
    pub fn fail_next_publishes(&self, kinds: impl IntoIterator<Item = ErrorKind>) {
        self.publish_failures
            .lock()
            .expect("failure queue mutex poisoned")
            .extend(kinds);
    }

    /// Make the next pulls fail, one injected kind per pull
    pub fn fail_next_pulls(&self, kinds: impl IntoIterator<Item = ErrorKind>) {
        self.pull_failures
            .lock()
            .expect("failure queue mutex poisoned")
            .extend(kinds);
    }

    /// Payloads accepted on a topic, in publish order
    #[must_use]
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.lock().published.get(topic).cloned().unwrap_or_default()
    }

    /// Every publish call seen, including failed ones
    #[must_use]
    pub fn publish_attempts(&self) -> u64 {
        self.lock().publish_attempts
    }

    #[must_use]
    pub fn ack_record(&self, message_id: &str) -> AckRecord {
        self.lock().acks.get(message_id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_acks(&self) -> u32 {
        self.lock().acks.values().map(|r| r.acks).sum()
    }

    #[must_use]
    pub fn total_nacks(&self) -> u32 {
        self.lock().acks.values().map(|r| r.nacks).sum()
    }

    /// Messages waiting for delivery on a subscription
    #[must_use]
    pub fn backlog(&self, subscription: &str) -> usize {
        self.lock().queues.get(subscription).map_or(0, VecDeque::len)
    }
}

impl PubSubIO for FakePubSubIO {
    fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: HashMap<String, String>,
    ) -> CloudResult<String> {
        self.lock().publish_attempts += 1;
        next_failure(&self.publish_failures, "publish")?;

        let mut state = self.lock();
        let subscriptions = state.topics.get(topic).cloned().ok_or_else(|| {
            CloudIOError::new(ErrorKind::NotFound, format!("Topic {topic} not found"))
        })?;

        state.message_counter += 1;
        let msg_id = format!("msg-{}", state.message_counter);
        state
            .published
            .entry(topic.to_string())
            .or_default()
            .push(data.to_vec());

        for subscription in subscriptions {
            let message = ReceivedMessage {
                id: msg_id.clone(),
                ack_id: String::new(),
                data: data.to_vec(),
                attributes: attributes.clone(),
                publish_time: Some(0),
                delivery_attempt: 0,
            };
            state.queues.entry(subscription).or_default().push_back(message);
        }

        drop(state);
        Ok(msg_id)
    }

    fn pull(&self, subscription: &str, max_messages: u32) -> CloudResult<Vec<ReceivedMessage>> {
        next_failure(&self.pull_failures, "pull")?;

        let mut state = self.lock();
        let queue = state.queues.get_mut(subscription).ok_or_else(|| {
            CloudIOError::new(
                ErrorKind::NotFound,
                format!("Subscription {subscription} not found"),
            )
        })?;

        let count = std::cmp::min(max_messages as usize, queue.len());
        let drained: Vec<ReceivedMessage> = queue.drain(0..count).collect();

        let mut pulled = Vec::with_capacity(drained.len());
        for mut message in drained {
            state.delivery_counter += 1;
            message.ack_id = format!("ack-{}", state.delivery_counter);
            message.delivery_attempt += 1;
            state.outstanding.insert(
                message.ack_id.clone(),
                (subscription.to_string(), message.clone()),
            );
            pulled.push(message);
        }

        drop(state);
        Ok(pulled)
    }

    fn acknowledge(&self, _subscription: &str, ack_ids: &[String]) -> CloudResult<()> {
        let mut state = self.lock();
        for ack_id in ack_ids {
            if let Some((_, message)) = state.outstanding.remove(ack_id) {
                state.acks.entry(message.id).or_default().acks += 1;
            }
        }
        drop(state);
        Ok(())
    }

    fn negative_acknowledge(&self, _subscription: &str, ack_ids: &[String]) -> CloudResult<()> {
        let mut state = self.lock();
        for ack_id in ack_ids {
            if let Some((subscription, message)) = state.outstanding.remove(ack_id) {
                state.acks.entry(message.id.clone()).or_default().nacks += 1;
                state
                    .queues
                    .entry(subscription)
                    .or_default()
                    .push_front(message);
            }
        }
        drop(state);
        Ok(())
    }
}
