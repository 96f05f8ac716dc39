//! Client-local key/value storage for editor preferences.
//!
//! Plain string entries with no schema versioning: the display name and the
//! font size are read when a session starts and written whenever they change.

use crate::collab::participant::random_base36;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, warn};

pub const DISPLAY_NAME_KEY: &str = "collab-user-name";
pub const FONT_SIZE_KEY: &str = "editor-font-size";

pub const DEFAULT_FONT_SIZE: u8 = 14;
pub const MIN_FONT_SIZE: u8 = 10;
pub const MAX_FONT_SIZE: u8 = 32;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is corrupt: {0}")]
    Corrupt(String),
}

pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory storage, scoped to one process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage persisted as a JSON object in a single file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&*entries)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Typed view over the preference entries.
pub struct Preferences<'a> {
    storage: &'a dyn ClientStorage,
}

impl<'a> Preferences<'a> {
    pub fn new(storage: &'a dyn ClientStorage) -> Self {
        Self { storage }
    }

    /// The stored display name, or a freshly generated `User-xxxxx` that is
    /// persisted so the next session reuses it.
    pub fn resolve_display_name(&self) -> String {
        if let Some(name) = self
            .storage
            .get(DISPLAY_NAME_KEY)
            .filter(|n| !n.trim().is_empty())
        {
            return name;
        }

        let generated = format!("User-{}", random_base36(5));
        match self.storage.set(DISPLAY_NAME_KEY, &generated) {
            Ok(()) => info!("Generated display name {}", generated),
            Err(e) => warn!("Could not persist generated display name: {}", e),
        }
        generated
    }

    pub fn set_display_name(&self, name: &str) -> Result<(), StorageError> {
        self.storage.set(DISPLAY_NAME_KEY, name)
    }

    pub fn font_size(&self) -> u8 {
        self.storage
            .get(FONT_SIZE_KEY)
            .and_then(|v| v.trim().parse::<u8>().ok())
            .map(|v| v.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE))
            .unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// Store a font size, clamped to the supported range. Returns the value
    /// actually stored.
    pub fn set_font_size(&self, size: u8) -> Result<u8, StorageError> {
        let size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.storage.set(FONT_SIZE_KEY, &size.to_string())?;
        Ok(size)
    }
}
