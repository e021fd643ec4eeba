//! Session registry: per-session PubSub fan-out with a bounded replay ring.
//!
//! Every published event gets a monotonic id and lands in a ring of the most
//! recent `ring_capacity` events. A subscriber reconnecting with
//! `Last-Event-ID: n` first receives every stored event with id > n in
//! ascending order, then live delivery. Slow subscribers lag on their own
//! broadcast receiver and are disconnected by the stream handler; other
//! subscribers are unaffected.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-subscriber buffering bound; beyond it the subscriber lags and is
/// disconnected.
const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("session not found: {0}")]
    NotFound(String),
}

/// One stored (and broadcast) event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub id: u64,
    pub data: Value,
}

/// What subscribers receive on the live channel.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    Event(StoredEvent),
    /// Completion marker; handlers close the connection.
    Done,
    /// Fault marker; handlers close the connection.
    Error(String),
}

struct SessionTopic {
    sender: broadcast::Sender<StreamMessage>,
    ring: VecDeque<StoredEvent>,
    next_id: u64,
}

impl SessionTopic {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self { sender, ring: VecDeque::new(), next_id: 1 }
    }
}

pub struct SessionRegistry {
    topics: RwLock<HashMap<String, SessionTopic>>,
    ring_capacity: usize,
    topic_prefix: String,
}

impl SessionRegistry {
    pub fn new(ring_capacity: usize, topic_prefix: impl Into<String>) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            ring_capacity,
            topic_prefix: topic_prefix.into(),
        }
    }

    /// Create a session with a fresh id.
    pub async fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.create_session_with_id(&session_id).await;
        session_id
    }

    /// Create (or keep) a session under the given id. Idempotent.
    pub async fn create_session_with_id(&self, session_id: &str) {
        let mut topics = self.topics.write().await;
        topics.entry(session_id.to_string()).or_insert_with(SessionTopic::new);
        info!(topic = %self.topic_name(session_id), "session created");
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.topics.read().await.contains_key(session_id)
    }

    /// Publish one event; returns its assigned id.
    pub async fn broadcast(&self, session_id: &str, data: Value) -> Result<u64, RegistryError> {
        let mut topics = self.topics.write().await;
        let topic = topics
            .get_mut(session_id)
            .ok_or_else(|| RegistryError::NotFound(session_id.to_string()))?;

        let event = StoredEvent { id: topic.next_id, data };
        topic.next_id += 1;
        topic.ring.push_back(event.clone());
        while topic.ring.len() > self.ring_capacity {
            topic.ring.pop_front();
        }

        // No live subscribers is fine; the ring still serves replay.
        let delivered = topic.sender.send(StreamMessage::Event(event.clone())).unwrap_or(0);
        debug!(
            topic = %self.topic_name(session_id),
            event_id = event.id,
            subscribers = delivered,
            "event published"
        );
        Ok(event.id)
    }

    /// Publish the completion marker.
    pub async fn broadcast_done(&self, session_id: &str) -> Result<(), RegistryError> {
        self.send_marker(session_id, StreamMessage::Done).await
    }

    /// Publish a fault marker.
    pub async fn broadcast_error(
        &self,
        session_id: &str,
        message: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.send_marker(session_id, StreamMessage::Error(message.into())).await
    }

    /// Subscribe, replaying stored events with id > `last_event_id` first.
    /// A fresh subscriber (no `Last-Event-ID`) receives the whole ring, so a
    /// late-joining client still sees every buffered envelope.
    pub async fn subscribe(
        &self,
        session_id: &str,
        last_event_id: Option<u64>,
    ) -> Result<(Vec<StoredEvent>, broadcast::Receiver<StreamMessage>), RegistryError> {
        let topics = self.topics.read().await;
        let topic = topics
            .get(session_id)
            .ok_or_else(|| RegistryError::NotFound(session_id.to_string()))?;

        let receiver = topic.sender.subscribe();
        let after = last_event_id.unwrap_or(0);
        let replay: Vec<StoredEvent> =
            topic.ring.iter().filter(|event| event.id > after).cloned().collect();
        if topic.ring.front().map(|event| event.id > after + 1).unwrap_or(false) {
            warn!(
                topic = %self.topic_name(session_id),
                after,
                "replay window truncated, oldest stored event is newer than requested"
            );
        }
        Ok((replay, receiver))
    }

    /// Drop a session and terminate its streams.
    pub async fn remove(&self, session_id: &str) {
        if let Some(topic) = self.topics.write().await.remove(session_id) {
            let _ = topic.sender.send(StreamMessage::Done);
            info!(topic = %self.topic_name(session_id), "session removed");
        }
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.topics.read().await.keys().cloned().collect()
    }

    async fn send_marker(
        &self,
        session_id: &str,
        marker: StreamMessage,
    ) -> Result<(), RegistryError> {
        let topics = self.topics.read().await;
        let topic = topics
            .get(session_id)
            .ok_or_else(|| RegistryError::NotFound(session_id.to_string()))?;
        let _ = topic.sender.send(marker);
        Ok(())
    }

    fn topic_name(&self, session_id: &str) -> String {
        format!("{}{}", self.topic_prefix, session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry(capacity: usize) -> SessionRegistry {
        SessionRegistry::new(capacity, "a2ui:session:")
    }

    #[tokio::test]
    async fn broadcast_assigns_monotonic_ids() {
        let registry = registry(100);
        let session = registry.create_session().await;
        assert_eq!(registry.broadcast(&session, json!(1)).await.unwrap(), 1);
        assert_eq!(registry.broadcast(&session, json!(2)).await.unwrap(), 2);
        assert_eq!(registry.broadcast(&session, json!(3)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn broadcast_to_unknown_session_is_not_found() {
        let registry = registry(100);
        let err = registry.broadcast("ghost", json!(1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn replay_returns_events_after_last_id_in_order() {
        let registry = registry(100);
        let session = registry.create_session().await;
        for i in 1..=10 {
            registry.broadcast(&session, json!({ "n": i })).await.unwrap();
        }

        let (replay, _live) = registry.subscribe(&session, Some(6)).await.unwrap();
        let ids: Vec<u64> = replay.iter().map(|event| event.id).collect();
        assert_eq!(ids, vec![7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn ring_is_bounded() {
        let registry = registry(3);
        let session = registry.create_session().await;
        for i in 1..=5 {
            registry.broadcast(&session, json!(i)).await.unwrap();
        }
        let (replay, _live) = registry.subscribe(&session, Some(0)).await.unwrap();
        let ids: Vec<u64> = replay.iter().map(|event| event.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn live_subscribers_receive_after_replay_point() {
        let registry = registry(100);
        let session = registry.create_session().await;
        registry.broadcast(&session, json!(1)).await.unwrap();

        let (replay, mut live) = registry.subscribe(&session, Some(1)).await.unwrap();
        assert!(replay.is_empty());

        registry.broadcast(&session, json!(2)).await.unwrap();
        let StreamMessage::Event(event) = live.recv().await.unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.id, 2);
    }

    #[tokio::test]
    async fn done_marker_reaches_subscribers() {
        let registry = registry(100);
        let session = registry.create_session().await;
        let (_, mut live) = registry.subscribe(&session, None).await.unwrap();
        registry.broadcast_done(&session).await.unwrap();
        assert!(matches!(live.recv().await.unwrap(), StreamMessage::Done));
    }

    #[tokio::test]
    async fn create_session_with_id_is_idempotent() {
        let registry = registry(100);
        registry.create_session_with_id("fixed").await;
        registry.broadcast("fixed", json!(1)).await.unwrap();
        registry.create_session_with_id("fixed").await;
        // The ring survives re-creation.
        let (replay, _) = registry.subscribe("fixed", Some(0)).await.unwrap();
        assert_eq!(replay.len(), 1);
    }
}
