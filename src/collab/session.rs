//! Collaborative editing session.
//!
//! A session binds one editor tab to a room in the [`DocumentStore`]:
//!
//! - the room's text is a single shared document, synchronized with
//!   last-writer-wins at whole-document granularity. The newest [`Revision`]
//!   replaces older content everywhere; concurrent edits are not merged, so
//!   the losing writer's keystrokes since its last push are overwritten.
//! - each participant writes a small presence record (name, color, cursor)
//!   on a heartbeat, and on a debounce after cursor or name changes.
//! - the store is optional at runtime: when it is unreachable the editor
//!   keeps working on its local buffer and pushes once it comes back.

use crate::collab::participant::{active_peers, Cursor, Participant, Peer, PresenceRecord};
use crate::collab::room::{share_link, EditorLanguage, RoomToken, SessionEntry};
use crate::collab::share::{share_room_link, CopyFeedback, ShareError, ShareOutcome, SharePlatform};
use crate::collab::store::{DocumentStore, Revision, RoomDocument, StoreError};
use crate::retry::{with_retry_if, RetryConfig};
use chrono::Utc;
use futures::StreamExt;
use reqwest::Url;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Timing knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Interval between presence writes while idle
    pub presence_heartbeat: Duration,
    /// Peers not seen for this long are hidden
    pub presence_stale_after: Duration,
    /// Quiet period before local edits and cursor moves are written
    pub push_debounce: Duration,
    /// Backoff for (re)establishing live subscriptions
    pub resubscribe: RetryConfig,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            presence_heartbeat: Duration::from_secs(30),
            presence_stale_after: Duration::from_secs(120),
            push_debounce: Duration::from_millis(100),
            resubscribe: RetryConfig::store_subscription(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    /// Store unreachable; editing continues locally.
    Degraded,
}

/// Outcome of comparing a delivered snapshot with the local document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconciled {
    /// The remote snapshot replaced the local document.
    Adopted,
    /// Same revision as ours, typically our own echo.
    Unchanged,
    /// The store holds an older write than ours; ours must be written back.
    LocalNewer,
}

/// The tab's copy of the room document.
#[derive(Debug, Clone, PartialEq)]
struct LocalDocument {
    text: String,
    language: EditorLanguage,
    revision: Option<Revision>,
    /// Local changes not yet acknowledged by the store.
    dirty: bool,
}

impl LocalDocument {
    fn touch(&mut self, author: &str) {
        self.revision = Some(Revision::after(self.revision.as_ref(), author));
        self.dirty = true;
    }

    /// Last-writer-wins: adopt `remote` only if it is newer than what we
    /// hold, including an edit still waiting to be pushed. If the store
    /// regressed below our revision, the local document is marked dirty so
    /// the winner gets written back.
    fn reconcile(&mut self, remote: RoomDocument) -> Reconciled {
        if let Some(local) = &self.revision {
            if remote.revision == *local {
                return Reconciled::Unchanged;
            }
            if remote.revision < *local {
                self.dirty = true;
                return Reconciled::LocalNewer;
            }
        }

        self.text = remote.text;
        if let Some(language) = EditorLanguage::from_tag(&remote.language) {
            self.language = language;
        }
        self.revision = Some(remote.revision);
        self.dirty = false;
        Reconciled::Adopted
    }

    fn to_remote(&self) -> Option<RoomDocument> {
        self.revision.as_ref().map(|revision| RoomDocument {
            text: self.text.clone(),
            language: self.language.tag().to_string(),
            revision: revision.clone(),
        })
    }
}

struct Shared {
    room: RoomToken,
    store: Arc<dyn DocumentStore>,
    timing: SessionTiming,
    participant: Mutex<Participant>,
    document: Mutex<LocalDocument>,
    cursor: Mutex<Option<Cursor>>,
    peers: Mutex<Vec<Peer>>,
    connection: Mutex<ConnectionState>,
    push_tx: mpsc::UnboundedSender<()>,
    changes: watch::Sender<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Shared {
    fn notify(&self) {
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }

    fn set_connection(&self, state: ConnectionState) {
        let changed = {
            let mut current = lock(&self.connection);
            let changed = *current != state;
            *current = state;
            changed
        };
        if changed {
            match state {
                ConnectionState::Connected => info!("Room {}: connected to store", self.room),
                ConnectionState::Degraded => warn!("Room {}: store unreachable, editing locally", self.room),
            }
            self.notify();
        }
    }

    /// Log a store result and track connectivity. Never propagates.
    fn record(&self, operation: &str, result: Result<(), StoreError>) -> bool {
        match result {
            Ok(()) => {
                self.set_connection(ConnectionState::Connected);
                true
            }
            Err(e) => {
                warn!("Room {}: {} failed: {}", self.room, operation, e);
                if e.is_transient() {
                    self.set_connection(ConnectionState::Degraded);
                }
                false
            }
        }
    }

    fn is_dirty(&self) -> bool {
        lock(&self.document).dirty
    }

    fn request_push(&self) {
        let _ = self.push_tx.send(());
    }

    fn apply_remote(&self, remote: RoomDocument) {
        let author = remote.revision.author.clone();
        let outcome = lock(&self.document).reconcile(remote);
        match outcome {
            Reconciled::Adopted => {
                debug!("Room {}: applied remote document from {}", self.room, author);
                self.notify();
            }
            Reconciled::LocalNewer => {
                if author == lock(&self.participant).id {
                    debug!("Room {}: late echo of an earlier push", self.room);
                } else {
                    warn!(
                        "Room {}: store holds an older document from {}, writing ours back",
                        self.room, author
                    );
                }
                self.request_push();
            }
            Reconciled::Unchanged => {}
        }
    }

    fn apply_presence(&self, records: &[PresenceRecord]) {
        let self_id = lock(&self.participant).id.clone();
        let peers = active_peers(
            records,
            &self_id,
            Utc::now().timestamp_millis(),
            self.timing.presence_stale_after,
        );
        *lock(&self.peers) = peers;
        self.notify();
    }

    fn presence_record(&self) -> PresenceRecord {
        let participant = lock(&self.participant).clone();
        let cursor = *lock(&self.cursor);
        PresenceRecord::for_participant(&participant, cursor, Utc::now().timestamp_millis())
    }

    fn pending_document(&self) -> Option<RoomDocument> {
        let document = lock(&self.document);
        if document.dirty {
            document.to_remote()
        } else {
            None
        }
    }

    fn acknowledge(&self, pushed: &Revision) {
        let mut document = lock(&self.document);
        if document.revision.as_ref() == Some(pushed) {
            document.dirty = false;
        }
    }

    /// Write the local document if it has unpushed changes.
    async fn flush(&self) {
        let Some(pending) = self.pending_document() else {
            return;
        };
        let revision = pending.revision.clone();
        let result = self.store.write_document(&self.room, pending).await;
        if self.record("document push", result) {
            self.acknowledge(&revision);
        }
    }
}

/// A live collaborative editing session for one room.
pub struct CollabSession {
    shared: Arc<Shared>,
    presence_tx: mpsc::UnboundedSender<()>,
    copy_feedback: CopyFeedback,
    tasks: Vec<JoinHandle<()>>,
}

impl CollabSession {
    /// Join (or create) the room named by `entry`.
    ///
    /// Never fails: if the store cannot be reached the session starts in
    /// [`ConnectionState::Degraded`] and keeps retrying in the background.
    /// `initial_text` seeds a room that does not exist yet.
    pub async fn start(
        store: Arc<dyn DocumentStore>,
        entry: &SessionEntry,
        participant: Participant,
        initial_text: &str,
        timing: SessionTiming,
    ) -> Self {
        let room = entry.room.clone();
        let mut document = LocalDocument {
            text: initial_text.to_string(),
            language: entry.language,
            revision: None,
            dirty: false,
        };
        let mut connection = ConnectionState::Connected;

        match store.load_document(&room).await {
            Ok(Some(remote)) => {
                info!("Joining room {} as {}", room, participant.name);
                document.reconcile(remote);
            }
            Ok(None) => {
                info!("Creating room {} as {}", room, participant.name);
                if !initial_text.is_empty() {
                    document.touch(&participant.id);
                }
            }
            Err(e) => {
                warn!("Could not load room {}, editing locally: {}", room, e);
                connection = ConnectionState::Degraded;
            }
        }

        let (push_tx, push_rx) = mpsc::unbounded_channel();
        let (presence_tx, presence_rx) = mpsc::unbounded_channel();
        let (changes, _) = watch::channel(0);

        let dirty = document.dirty;
        let shared = Arc::new(Shared {
            room,
            store,
            timing,
            participant: Mutex::new(participant),
            document: Mutex::new(document),
            cursor: Mutex::new(None),
            peers: Mutex::new(Vec::new()),
            connection: Mutex::new(connection),
            push_tx,
            changes,
        });

        if dirty {
            shared.request_push();
        }

        let tasks = vec![
            tokio::spawn(run_document_subscription(Arc::clone(&shared))),
            tokio::spawn(run_presence_subscription(Arc::clone(&shared))),
            tokio::spawn(run_presence_heartbeat(Arc::clone(&shared), presence_rx)),
            tokio::spawn(run_push(Arc::clone(&shared), push_rx)),
        ];

        Self {
            shared,
            presence_tx,
            copy_feedback: CopyFeedback::default(),
            tasks,
        }
    }

    pub fn room(&self) -> &RoomToken {
        &self.shared.room
    }

    pub fn participant(&self) -> Participant {
        lock(&self.shared.participant).clone()
    }

    pub fn text(&self) -> String {
        lock(&self.shared.document).text.clone()
    }

    pub fn language(&self) -> EditorLanguage {
        lock(&self.shared.document).language
    }

    pub fn revision(&self) -> Option<Revision> {
        lock(&self.shared.document).revision.clone()
    }

    /// Whether local changes are still waiting to reach the store.
    pub fn has_pending_changes(&self) -> bool {
        self.shared.is_dirty()
    }

    pub fn peers(&self) -> Vec<Peer> {
        lock(&self.shared.peers).clone()
    }

    pub fn connection(&self) -> ConnectionState {
        *lock(&self.shared.connection)
    }

    /// Ticks whenever remote state, peers, or connectivity change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    /// Replace the local buffer. Applied immediately; written to the store
    /// after the debounce.
    pub fn edit(&self, text: &str) {
        {
            let author = lock(&self.shared.participant).id.clone();
            let mut document = lock(&self.shared.document);
            document.text = text.to_string();
            document.touch(&author);
        }
        self.shared.request_push();
    }

    pub fn set_language(&self, language: EditorLanguage) {
        {
            let author = lock(&self.shared.participant).id.clone();
            let mut document = lock(&self.shared.document);
            if document.language == language {
                return;
            }
            document.language = language;
            document.touch(&author);
        }
        self.shared.request_push();
    }

    pub fn set_cursor(&self, cursor: Option<Cursor>) {
        *lock(&self.shared.cursor) = cursor;
        let _ = self.presence_tx.send(());
    }

    pub fn rename(&self, name: &str) {
        lock(&self.shared.participant).name = name.to_string();
        let _ = self.presence_tx.send(());
    }

    /// Link that joins this room from `page` (the collaborative page URL).
    pub fn share_link(&self, page: &Url) -> Url {
        share_link(page, &self.shared.room, self.language())
    }

    pub fn share(
        &mut self,
        page: &Url,
        title: &str,
        platform: &dyn SharePlatform,
    ) -> Result<ShareOutcome, ShareError> {
        let link = self.share_link(page);
        let outcome = share_room_link(platform, title, &link)?;
        if outcome == ShareOutcome::Copied {
            self.copy_feedback.mark(Instant::now());
        }
        Ok(outcome)
    }

    pub fn copied_feedback_active(&self) -> bool {
        self.copy_feedback.is_active(Instant::now())
    }

    /// Leave the room: stop live subscriptions, push any pending edit, and
    /// remove this participant's presence.
    pub async fn shutdown(mut self) {
        for task in std::mem::take(&mut self.tasks) {
            task.abort();
            let _ = task.await;
        }

        self.shared.flush().await;

        let participant_id = lock(&self.shared.participant).id.clone();
        let result = self
            .shared
            .store
            .remove_presence(&self.shared.room, &participant_id)
            .await;
        self.shared.record("presence removal", result);

        info!("Left room {}", self.shared.room);
    }
}

impl Drop for CollabSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn run_document_subscription(shared: Arc<Shared>) {
    loop {
        let subscribed = with_retry_if(
            &shared.timing.resubscribe,
            "Document subscription",
            || shared.store.subscribe_document(&shared.room),
            StoreError::is_transient,
        )
        .await;

        match subscribed {
            Ok(mut updates) => {
                shared.set_connection(ConnectionState::Connected);
                while let Some(remote) = updates.next().await {
                    shared.apply_remote(remote);
                }
                warn!("Room {}: document subscription closed", shared.room);
            }
            Err(e) => {
                shared.record("document subscription", Err(e));
            }
        }

        tokio::time::sleep(shared.timing.resubscribe.max_delay).await;
    }
}

async fn run_presence_subscription(shared: Arc<Shared>) {
    loop {
        let subscribed = with_retry_if(
            &shared.timing.resubscribe,
            "Presence subscription",
            || shared.store.subscribe_presence(&shared.room),
            StoreError::is_transient,
        )
        .await;

        match subscribed {
            Ok(mut updates) => {
                while let Some(records) = updates.next().await {
                    shared.apply_presence(&records);
                }
                warn!("Room {}: presence subscription closed", shared.room);
            }
            Err(e) => {
                shared.record("presence subscription", Err(e));
            }
        }

        tokio::time::sleep(shared.timing.resubscribe.max_delay).await;
    }
}

async fn run_presence_heartbeat(shared: Arc<Shared>, mut presence_rx: mpsc::UnboundedReceiver<()>) {
    let mut ticker = tokio::time::interval(shared.timing.presence_heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Retry edits that failed to push while the store was down
                if shared.is_dirty() {
                    shared.request_push();
                }
            }
            Some(()) = presence_rx.recv() => {
                tokio::time::sleep(shared.timing.push_debounce).await;
                while presence_rx.try_recv().is_ok() {}
            }
        }

        let record = shared.presence_record();
        let result = shared.store.write_presence(&shared.room, record).await;
        shared.record("presence update", result);
    }
}

async fn run_push(shared: Arc<Shared>, mut push_rx: mpsc::UnboundedReceiver<()>) {
    while push_rx.recv().await.is_some() {
        // Trailing-edge debounce: wait for a quiet period
        loop {
            match tokio::time::timeout(shared.timing.push_debounce, push_rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) | Err(_) => break,
            }
        }
        shared.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::store::MemoryStore;
    use std::cell::RefCell;

    fn fast_timing() -> SessionTiming {
        SessionTiming {
            presence_heartbeat: Duration::from_millis(50),
            presence_stale_after: Duration::from_secs(5),
            push_debounce: Duration::from_millis(10),
            resubscribe: RetryConfig::new(2, Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(20)),
        }
    }

    fn entry(room: &str) -> SessionEntry {
        SessionEntry {
            room: RoomToken::parse(room).unwrap(),
            language: EditorLanguage::TypeScript,
            rewritten_url: None,
        }
    }

    fn remote(text: &str, timestamp_ms: i64, author: &str) -> RoomDocument {
        RoomDocument {
            text: text.to_string(),
            language: "typescript".to_string(),
            revision: Revision {
                timestamp_ms,
                author: author.to_string(),
            },
        }
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !check() {
            assert!(Instant::now() < deadline, "condition not met in time");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn start(store: &MemoryStore, room: &str, name: &str, initial: &str) -> CollabSession {
        CollabSession::start(
            Arc::new(store.clone()),
            &entry(room),
            Participant::new(name),
            initial,
            fast_timing(),
        )
        .await
    }

    // ==================== Reconcile Tests ====================

    #[test]
    fn test_reconcile_adopts_newer_remote() {
        let mut local = LocalDocument {
            text: "old".into(),
            language: EditorLanguage::TypeScript,
            revision: Some(Revision { timestamp_ms: 1, author: "a".into() }),
            dirty: false,
        };
        assert_eq!(local.reconcile(remote("new", 2, "b")), Reconciled::Adopted);
        assert_eq!(local.text, "new");
        assert!(!local.dirty);
    }

    #[test]
    fn test_reconcile_ignores_echo() {
        let mut local = LocalDocument {
            text: "mine".into(),
            language: EditorLanguage::TypeScript,
            revision: Some(Revision { timestamp_ms: 5, author: "a".into() }),
            dirty: false,
        };
        assert_eq!(local.reconcile(remote("echo", 5, "a")), Reconciled::Unchanged);
        assert_eq!(local.text, "mine");
        assert!(!local.dirty);
    }

    #[test]
    fn test_reconcile_older_remote_marks_local_for_write_back() {
        let mut local = LocalDocument {
            text: "mine".into(),
            language: EditorLanguage::TypeScript,
            revision: Some(Revision { timestamp_ms: 5, author: "a".into() }),
            dirty: false,
        };
        assert_eq!(local.reconcile(remote("older", 4, "b")), Reconciled::LocalNewer);
        assert_eq!(local.text, "mine");
        assert_eq!(local.revision.as_ref().unwrap().timestamp_ms, 5);
        assert!(local.dirty);
    }

    #[test]
    fn test_reconcile_remote_newer_than_pending_edit_wins() {
        let mut local = LocalDocument {
            text: "pending".into(),
            language: EditorLanguage::TypeScript,
            revision: Some(Revision { timestamp_ms: 5, author: "a".into() }),
            dirty: true,
        };
        assert_eq!(local.reconcile(remote("theirs", 6, "b")), Reconciled::Adopted);
        assert_eq!(local.text, "theirs");
        assert!(!local.dirty);
    }

    #[test]
    fn test_reconcile_without_local_revision_always_adopts() {
        let mut local = LocalDocument {
            text: "template".into(),
            language: EditorLanguage::Python,
            revision: None,
            dirty: false,
        };
        assert_eq!(local.reconcile(remote("shared", 1, "b")), Reconciled::Adopted);
        assert_eq!(local.language, EditorLanguage::TypeScript);
    }

    // ==================== Session Tests ====================

    #[tokio::test]
    async fn test_new_room_is_seeded_with_initial_text() {
        let store = MemoryStore::new();
        let session = start(&store, "seed", "Ana", "// hello").await;
        let room = session.room().clone();
        let author = session.participant().id;

        eventually(|| store.document(&room).is_some()).await;
        let document = store.document(&room).unwrap();
        assert_eq!(document.text, "// hello");
        assert_eq!(document.revision.author, author);
        eventually(|| !session.has_pending_changes()).await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_joining_existing_room_adopts_its_text() {
        let store = MemoryStore::new();
        let room = RoomToken::parse("existing").unwrap();
        store
            .write_document(&room, remote("shared code", 1, "someone"))
            .await
            .unwrap();

        let session = start(&store, "existing", "Ana", "// template").await;
        assert_eq!(session.text(), "shared code");
        assert!(!session.has_pending_changes());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_two_sessions_converge() {
        let store = MemoryStore::new();
        let a = start(&store, "pair", "Ana", "").await;
        let b = start(&store, "pair", "Ben", "").await;

        a.edit("fn main() {}");
        eventually(|| b.text() == "fn main() {}").await;

        b.edit("fn main() { println!(); }");
        eventually(|| a.text() == "fn main() { println!(); }").await;

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_stale_remote_write_is_ignored() {
        let store = MemoryStore::new();
        let session = start(&store, "stale", "Ana", "").await;
        session.edit("latest");
        eventually(|| !session.has_pending_changes()).await;

        let room = session.room().clone();
        store.write_document(&room, remote("ancient", 1, "ghost")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.text(), "latest");

        let future = Utc::now().timestamp_millis() + 60_000;
        store.write_document(&room, remote("newer", future, "ghost")).await.unwrap();
        eventually(|| session.text() == "newer").await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_stale_store_write_is_overwritten_by_newest_edit() {
        let store = MemoryStore::new();
        let a = start(&store, "lagging", "Ana", "").await;
        a.edit("newest");
        eventually(|| !a.has_pending_changes()).await;

        let room = a.room().clone();
        store.write_document(&room, remote("stale", 1, "lagging-writer")).await.unwrap();
        eventually(|| store.document(&room).map(|d| d.text) == Some("newest".to_string())).await;
        eventually(|| !a.has_pending_changes()).await;

        let c = start(&store, "lagging", "Cai", "").await;
        assert_eq!(c.text(), "newest");
        assert_eq!(a.text(), "newest");

        a.shutdown().await;
        c.shutdown().await;
    }

    #[tokio::test]
    async fn test_peers_see_each_other_and_leave() {
        let store = MemoryStore::new();
        let a = start(&store, "presence", "Ana", "").await;
        let b = start(&store, "presence", "Ben", "").await;

        eventually(|| a.peers().iter().any(|p| p.name == "Ben")).await;
        eventually(|| b.peers().iter().any(|p| p.name == "Ana")).await;
        assert!(a.peers().iter().all(|p| p.id != a.participant().id));

        b.shutdown().await;
        eventually(|| a.peers().is_empty()).await;
        a.shutdown().await;
    }

    #[tokio::test]
    async fn test_cursor_and_rename_reach_presence() {
        let store = MemoryStore::new();
        let session = start(&store, "cursor", "Ana", "").await;
        let room = session.room().clone();

        session.set_cursor(Some(Cursor { line: 2, column: 4 }));
        session.rename("Ana B.");
        eventually(|| {
            store.presence(&room).iter().any(|r| {
                r.name.as_deref() == Some("Ana B.") && r.cursor == Some(Cursor { line: 2, column: 4 })
            })
        })
        .await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_offline_store_degrades_and_recovers() {
        let store = MemoryStore::new();
        store.set_available(false);

        let session = start(&store, "flaky", "Ana", "// template").await;
        assert_eq!(session.connection(), ConnectionState::Degraded);

        session.edit("typed offline");
        assert_eq!(session.text(), "typed offline");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.has_pending_changes());

        store.set_available(true);
        let room = session.room().clone();
        eventually(|| store.document(&room).map(|d| d.text) == Some("typed offline".to_string())).await;
        eventually(|| session.connection() == ConnectionState::Connected).await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_language_change_is_shared() {
        let store = MemoryStore::new();
        let a = start(&store, "lang", "Ana", "x").await;
        let b = start(&store, "lang", "Ben", "").await;

        a.set_language(EditorLanguage::Kotlin);
        eventually(|| b.language() == EditorLanguage::Kotlin).await;

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_unsubscribes_and_removes_presence() {
        let store = MemoryStore::new();
        let session = start(&store, "bye", "Ana", "").await;
        let room = session.room().clone();

        eventually(|| store.subscriber_count(&room) == 2).await;
        eventually(|| !store.presence(&room).is_empty()).await;

        session.shutdown().await;
        assert_eq!(store.subscriber_count(&room), 0);
        assert!(store.presence(&room).is_empty());
    }

    #[tokio::test]
    async fn test_changes_channel_ticks_on_remote_update() {
        let store = MemoryStore::new();
        let a = start(&store, "ticks", "Ana", "").await;
        let b = start(&store, "ticks", "Ben", "").await;
        let mut changes = b.changes();

        a.edit("hello");
        tokio::time::timeout(Duration::from_secs(3), async {
            while b.text() != "hello" {
                changes.changed().await.unwrap();
            }
        })
        .await
        .expect("update should arrive");

        a.shutdown().await;
        b.shutdown().await;
    }

    // ==================== Share Tests ====================

    struct ClipboardOnly {
        copied: RefCell<Option<String>>,
    }

    impl SharePlatform for ClipboardOnly {
        fn supports_native_share(&self) -> bool {
            false
        }

        fn native_share(&self, _title: &str, _url: &Url) -> Result<(), ShareError> {
            Err(ShareError::ShareSheet("unsupported".into()))
        }

        fn copy_to_clipboard(&self, text: &str) -> Result<(), ShareError> {
            *self.copied.borrow_mut() = Some(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_share_copies_room_link() {
        let store = MemoryStore::new();
        let mut session = start(&store, "abc123", "Ana", "").await;
        let page = Url::parse("https://example.com/en/developer-section/collaborative?room=abc123").unwrap();
        let platform = ClipboardOnly {
            copied: RefCell::new(None),
        };

        assert!(!session.copied_feedback_active());
        let outcome = session.share(&page, "Code with me", &platform).unwrap();
        assert_eq!(outcome, ShareOutcome::Copied);
        assert!(session.copied_feedback_active());
        assert_eq!(
            platform.copied.borrow().as_deref(),
            Some("https://example.com/en/developer-section/collaborative?room=abc123&language=typescript")
        );
        session.shutdown().await;
    }
}
