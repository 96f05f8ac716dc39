//! Collaborative code editor: rooms, participants, presence, and the
//! live session that keeps a tab in sync with the document store.
//!
//! - `room`: room tokens and the `?room=&language=` URL contract
//! - `participant`: per-tab identity and presence records
//! - `storage`: client-local preferences (display name, font size)
//! - `store`: the realtime document store seam and an in-memory store
//! - `session`: the live session controller
//! - `share`: handing a room link to the user

mod participant;
mod room;
mod session;
mod share;
mod storage;
mod store;

pub use participant::{active_peers, random_color, Cursor, Participant, Peer, PresenceRecord};
pub use room::{
    share_link, with_room, EditorLanguage, RoomToken, SessionEntry, LANGUAGE_PARAM, ROOM_PARAM,
};
pub use session::{CollabSession, ConnectionState, SessionTiming};
pub use share::{share_room_link, CopyFeedback, ShareError, ShareOutcome, SharePlatform, COPY_FEEDBACK};
pub use storage::{
    ClientStorage, FileStorage, MemoryStorage, Preferences, StorageError, DEFAULT_FONT_SIZE,
    DISPLAY_NAME_KEY, FONT_SIZE_KEY, MAX_FONT_SIZE, MIN_FONT_SIZE,
};
pub use store::{DocumentStore, MemoryStore, Revision, RoomDocument, StoreError};
