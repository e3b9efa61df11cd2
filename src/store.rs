//! Persistence collaborator: document snapshots keyed by document id.
//!
//! DESIGN
//! ======
//! The core only promises that a [`DocumentSnapshot`] round-trips items (id,
//! content, x, y, size), the background URL and the id counter exactly. How
//! and when snapshots are written is the host's call; the session just hands
//! out snapshots and accepts one at open time.
//!
//! `JsonFileStore` writes one pretty-printed JSON file per document under
//! its directory, via a temp file and rename so a crash never leaves a torn
//! snapshot behind.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::doc::{Document, Item};
use crate::error::StoreError;
use crate::transform::SteadyTransform;

/// Prefix of every storage key.
pub const STORAGE_KEY_PREFIX: &str = "EmojiArtDocument.";

// =============================================================================
// IDS + SNAPSHOT
// =============================================================================

/// Opaque identity of a document, independent of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Key the snapshot is stored under, e.g. `EmojiArtDocument.<uuid>`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{STORAGE_KEY_PREFIX}{}", self.0)
    }

    /// Inverse of [`Self::storage_key`].
    #[must_use]
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let raw = key.strip_prefix(STORAGE_KEY_PREFIX)?;
        match Uuid::parse_str(raw) {
            Ok(uuid) => Some(Self(uuid)),
            Err(_) => None,
        }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializable form of a document, plus the view when it is persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_url: Option<String>,
    #[serde(default)]
    pub next_id: u64,
    /// Steady pan/zoom; present only when the session persists its view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<SteadyTransform>,
}

impl DocumentSnapshot {
    #[must_use]
    pub fn capture(doc: &Document, view: Option<SteadyTransform>) -> Self {
        Self {
            items: doc.items().to_vec(),
            background_url: doc.background_url().map(ToString::to_string),
            next_id: doc.next_id(),
            view,
        }
    }

    /// Rebuild the document. An unparsable background URL is dropped.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let background_url = self.background_url.as_deref().and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, url = raw, "dropping unparsable background url from snapshot");
                None
            }
        });
        Document::from_parts(self.items.clone(), background_url, self.next_id)
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Where snapshots live.
pub trait DocumentStore: Send + Sync {
    /// Load a snapshot; `Ok(None)` if the document was never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    fn load(&self, id: DocumentId) -> Result<Option<DocumentSnapshot>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    fn save(&self, id: DocumentId, snapshot: &DocumentSnapshot) -> Result<(), StoreError>;

    /// Ids of every stored document, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be listed.
    fn list(&self) -> Result<Vec<DocumentId>, StoreError>;
}

// =============================================================================
// JSON FILES
// =============================================================================

/// One JSON file per document in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: DocumentId) -> PathBuf {
        self.dir.join(format!("{}.json", id.storage_key()))
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, id: DocumentId) -> Result<Option<DocumentSnapshot>, StoreError> {
        let path = self.path_for(id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_str(&raw)?;
        debug!(%id, path = %path.display(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, id: DocumentId, snapshot: &DocumentSnapshot) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &path)?;
        debug!(%id, path = %path.display(), items = snapshot.items.len(), "snapshot saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(key) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Some(id) = DocumentId::from_storage_key(key) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

// =============================================================================
// IN MEMORY
// =============================================================================

/// Keeps serialized snapshots in memory. Goes through JSON so it exercises the
/// same encoding as the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<DocumentId, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, id: DocumentId) -> Result<Option<DocumentSnapshot>, StoreError> {
        let snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        match snapshots.get(&id) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, id: DocumentId, snapshot: &DocumentSnapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_string(snapshot)?;
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, raw);
        Ok(())
    }

    fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        let mut ids: Vec<DocumentId> = self
            .snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }
}
