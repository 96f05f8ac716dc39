//! The realtime document store the collaborative editor synchronizes against.
//!
//! The production store is an external service (a synchronized key/value
//! document database); this module defines the seam and an in-process
//! [`MemoryStore`] for local development and tests.

use crate::collab::participant::PresenceRecord;
use crate::collab::room::RoomToken;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Orders whole-document writes. Later timestamp wins; the author id breaks
/// ties so every replica picks the same winner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision {
    pub timestamp_ms: i64,
    pub author: String,
}

impl Revision {
    /// A revision for a new local write by `author`, strictly after `prev`
    /// even when the local clock lags the writer of `prev`.
    pub fn after(prev: Option<&Revision>, author: &str) -> Self {
        let now = Utc::now().timestamp_millis();
        let timestamp_ms = match prev {
            Some(p) if p.timestamp_ms >= now => p.timestamp_ms + 1,
            _ => now,
        };
        Self {
            timestamp_ms,
            author: author.to_string(),
        }
    }
}

/// The shared text of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDocument {
    pub text: String,
    pub language: String,
    pub revision: Revision,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected the write: {0}")]
    Rejected(String),

    #[error("store payload could not be decoded: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether trying again later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Live, push-based document store keyed by room.
///
/// Subscriptions deliver the current state first, then every change, for as
/// long as the returned stream is held. Dropping the stream unsubscribes.
pub trait DocumentStore: Send + Sync {
    fn load_document(&self, room: &RoomToken) -> BoxFuture<'_, Result<Option<RoomDocument>, StoreError>>;

    fn write_document(&self, room: &RoomToken, document: RoomDocument) -> BoxFuture<'_, Result<(), StoreError>>;

    fn subscribe_document(
        &self,
        room: &RoomToken,
    ) -> BoxFuture<'_, Result<BoxStream<'static, RoomDocument>, StoreError>>;

    fn write_presence(&self, room: &RoomToken, record: PresenceRecord) -> BoxFuture<'_, Result<(), StoreError>>;

    fn remove_presence(&self, room: &RoomToken, participant_id: &str) -> BoxFuture<'_, Result<(), StoreError>>;

    fn subscribe_presence(
        &self,
        room: &RoomToken,
    ) -> BoxFuture<'_, Result<BoxStream<'static, Vec<PresenceRecord>>, StoreError>>;
}

const CHANNEL_CAPACITY: usize = 256;

struct RoomState {
    document: Option<RoomDocument>,
    presence: HashMap<String, PresenceRecord>,
    document_tx: broadcast::Sender<RoomDocument>,
    presence_tx: broadcast::Sender<Vec<PresenceRecord>>,
}

impl RoomState {
    fn new() -> Self {
        let (document_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (presence_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            document: None,
            presence: HashMap::new(),
            document_tx,
            presence_tx,
        }
    }

    fn presence_list(&self) -> Vec<PresenceRecord> {
        let mut list: Vec<_> = self.presence.values().cloned().collect();
        list.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        list
    }
}

#[derive(Default)]
struct MemoryInner {
    rooms: HashMap<RoomToken, RoomState>,
    unavailable: bool,
}

/// In-process store. Writes overwrite (the store does not arbitrate), and
/// every write is fanned out to the room's subscribers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going offline (`false`) or coming back (`true`).
    /// Existing subscriptions stay open but receive nothing while offline.
    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
    }

    /// Current document of `room`, bypassing availability.
    pub fn document(&self, room: &RoomToken) -> Option<RoomDocument> {
        self.lock().rooms.get(room).and_then(|r| r.document.clone())
    }

    /// Current presence records of `room`, bypassing availability.
    pub fn presence(&self, room: &RoomToken) -> Vec<PresenceRecord> {
        self.lock()
            .rooms
            .get(room)
            .map(RoomState::presence_list)
            .unwrap_or_default()
    }

    /// Number of live document and presence subscriptions for `room`.
    pub fn subscriber_count(&self, room: &RoomToken) -> usize {
        self.lock()
            .rooms
            .get(room)
            .map(|r| r.document_tx.receiver_count() + r.presence_tx.receiver_count())
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_room<T>(
        &self,
        room: &RoomToken,
        f: impl FnOnce(&mut RoomState) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        let state = inner.rooms.entry(room.clone()).or_insert_with(RoomState::new);
        Ok(f(state))
    }
}

fn receiver_stream<T: Clone + Send + 'static>(rx: broadcast::Receiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

impl DocumentStore for MemoryStore {
    fn load_document(&self, room: &RoomToken) -> BoxFuture<'_, Result<Option<RoomDocument>, StoreError>> {
        let result = self.with_room(room, |state| state.document.clone());
        Box::pin(async move { result })
    }

    fn write_document(&self, room: &RoomToken, document: RoomDocument) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = self.with_room(room, |state| {
            state.document = Some(document.clone());
            // No receivers is fine
            let _ = state.document_tx.send(document);
        });
        Box::pin(async move { result })
    }

    fn subscribe_document(
        &self,
        room: &RoomToken,
    ) -> BoxFuture<'_, Result<BoxStream<'static, RoomDocument>, StoreError>> {
        let result = self.with_room(room, |state| {
            let rx = state.document_tx.subscribe();
            let initial = state.document.clone();
            stream::iter(initial).chain(receiver_stream(rx)).boxed()
        });
        Box::pin(async move { result })
    }

    fn write_presence(&self, room: &RoomToken, record: PresenceRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = self.with_room(room, |state| {
            state.presence.insert(record.participant_id.clone(), record);
            let _ = state.presence_tx.send(state.presence_list());
        });
        Box::pin(async move { result })
    }

    fn remove_presence(&self, room: &RoomToken, participant_id: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = self.with_room(room, |state| {
            if state.presence.remove(participant_id).is_some() {
                let _ = state.presence_tx.send(state.presence_list());
            }
        });
        Box::pin(async move { result })
    }

    fn subscribe_presence(
        &self,
        room: &RoomToken,
    ) -> BoxFuture<'_, Result<BoxStream<'static, Vec<PresenceRecord>>, StoreError>> {
        let result = self.with_room(room, |state| {
            let rx = state.presence_tx.subscribe();
            let initial = state.presence_list();
            stream::iter(Some(initial)).chain(receiver_stream(rx)).boxed()
        });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomToken {
        RoomToken::parse("test-room").unwrap()
    }

    fn doc(text: &str, ts: i64, author: &str) -> RoomDocument {
        RoomDocument {
            text: text.to_string(),
            language: "typescript".to_string(),
            revision: Revision {
                timestamp_ms: ts,
                author: author.to_string(),
            },
        }
    }

    fn presence(id: &str, ts: i64) -> PresenceRecord {
        PresenceRecord {
            participant_id: id.to_string(),
            name: Some(id.to_string()),
            color: None,
            cursor: None,
            last_seen_ms: ts,
        }
    }

    // ==================== Revision Tests ====================

    #[test]
    fn test_revision_orders_by_time_then_author() {
        let a = Revision { timestamp_ms: 10, author: "b".into() };
        let b = Revision { timestamp_ms: 11, author: "a".into() };
        let c = Revision { timestamp_ms: 11, author: "b".into() };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_revision_after_is_strictly_later() {
        let future = Revision {
            timestamp_ms: Utc::now().timestamp_millis() + 60_000,
            author: "remote".into(),
        };
        let next = Revision::after(Some(&future), "local");
        assert!(next > future);
        assert_eq!(next.timestamp_ms, future.timestamp_ms + 1);

        let fresh = Revision::after(None, "local");
        assert!(fresh.timestamp_ms > 0);
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(StoreError::Unavailable("x".into()).is_transient());
        assert!(!StoreError::Rejected("x".into()).is_transient());
        assert!(!StoreError::Serialization("x".into()).is_transient());
    }

    // ==================== MemoryStore Tests ====================

    #[tokio::test]
    async fn test_load_missing_document() {
        let store = MemoryStore::new();
        assert_eq!(store.load_document(&room()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let store = MemoryStore::new();
        store.write_document(&room(), doc("hello", 1, "a")).await.unwrap();
        let loaded = store.load_document(&room()).await.unwrap().unwrap();
        assert_eq!(loaded.text, "hello");
    }

    #[tokio::test]
    async fn test_subscription_delivers_snapshot_then_updates() {
        let store = MemoryStore::new();
        store.write_document(&room(), doc("one", 1, "a")).await.unwrap();

        let mut updates = store.subscribe_document(&room()).await.unwrap();
        assert_eq!(updates.next().await.unwrap().text, "one");

        store.write_document(&room(), doc("two", 2, "a")).await.unwrap();
        assert_eq!(updates.next().await.unwrap().text, "two");
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let store = MemoryStore::new();
        let docs = store.subscribe_document(&room()).await.unwrap();
        let people = store.subscribe_presence(&room()).await.unwrap();
        assert_eq!(store.subscriber_count(&room()), 2);

        drop(docs);
        drop(people);
        assert_eq!(store.subscriber_count(&room()), 0);
    }

    #[tokio::test]
    async fn test_presence_subscription_lists_all_records() {
        let store = MemoryStore::new();
        store.write_presence(&room(), presence("b", 1)).await.unwrap();

        let mut updates = store.subscribe_presence(&room()).await.unwrap();
        assert_eq!(updates.next().await.unwrap().len(), 1);

        store.write_presence(&room(), presence("a", 2)).await.unwrap();
        let list = updates.next().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].participant_id, "a");

        store.remove_presence(&room(), "b").await.unwrap();
        assert_eq!(updates.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert!(store.load_document(&room()).await.is_err());
        assert!(store.write_document(&room(), doc("x", 1, "a")).await.is_err());
        assert!(store.subscribe_document(&room()).await.is_err());
        assert!(store.write_presence(&room(), presence("a", 1)).await.is_err());

        store.set_available(true);
        assert!(store.load_document(&room()).await.is_ok());
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let store = MemoryStore::new();
        let other = RoomToken::parse("other-room").unwrap();
        store.write_document(&room(), doc("mine", 1, "a")).await.unwrap();
        assert!(store.load_document(&other).await.unwrap().is_none());
    }
}
