//! Persisted engine state and its storage.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use glowmark_protocol::{ExportConfig, SyncCursor};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Upper bound on the pending-refresh queue; beyond it the oldest ids
/// are dropped, since a full resync covers them anyway.
pub const MAX_PENDING_REFRESH: usize = 200;

fn default_base_dir() -> String {
    "Glowmark".to_string()
}

fn default_true() -> bool {
    true
}

/// Location of one materialized note in the vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotePathEntry {
    /// Vault-relative file path.
    pub path: String,
    /// Entry update time at materialization, unix seconds.
    pub update_at: i64,
}

/// Everything the engine persists between runs.
///
/// The blob is versioned through `data_version`; a full resync bumps it
/// so stale concurrent writers can be detected by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncState {
    /// Auth token, empty when signed out.
    pub token: String,
    /// Vault folder all materialized notes live under.
    pub base_dir: String,
    /// Scheduled sync interval in minutes; 0 disables the schedule.
    pub frequency_minutes: u32,
    /// Whether a sync is triggered when the host app loads.
    pub trigger_on_load: bool,
    /// Whether delete/rename events queue notes for refresh.
    pub refresh_enabled: bool,
    /// Whether the previous run ended in an error.
    pub last_sync_failed: bool,
    /// The durably acknowledged sync position.
    pub last_cursor: SyncCursor,
    /// The last render/write policy received from the server.
    pub export_config: Option<ExportConfig>,
    /// Note id to vault path, for rename detection and reverse lookup.
    pub note_path_index: BTreeMap<String, NotePathEntry>,
    /// Note ids queued for a targeted re-download, oldest first.
    pub pending_refresh: Vec<String>,
    /// Bumped on every full resync.
    pub data_version: u64,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_dir: default_base_dir(),
            frequency_minutes: 0,
            trigger_on_load: default_true(),
            refresh_enabled: default_true(),
            last_sync_failed: false,
            last_cursor: SyncCursor::empty(),
            export_config: None,
            note_path_index: BTreeMap::new(),
            pending_refresh: Vec::new(),
            data_version: 0,
        }
    }
}

impl SyncState {
    /// The recorded vault path for a note id, if it still lies under the
    /// sync folder. Paths that moved out of the folder are treated as
    /// unmanaged.
    pub fn path_for(&self, note_id_x: &str) -> Option<&str> {
        let prefix = format!("{}/", self.base_dir);
        self.note_path_index
            .get(note_id_x)
            .map(|e| e.path.as_str())
            .filter(|p| p.starts_with(&prefix))
    }

    /// The note id recorded for a vault path, if any.
    pub fn note_id_for_path(&self, path: &str) -> Option<&str> {
        self.note_path_index
            .iter()
            .find(|(_, e)| e.path == path)
            .map(|(id, _)| id.as_str())
    }

    /// Records where a note was materialized.
    pub fn record_path(&mut self, note_id_x: &str, path: &str, update_at: i64) {
        self.note_path_index.insert(
            note_id_x.to_string(),
            NotePathEntry {
                path: path.to_string(),
                update_at,
            },
        );
    }

    /// Forgets the note recorded at `path`, returning its id.
    pub fn remove_path(&mut self, path: &str) -> Option<String> {
        let id = self.note_id_for_path(path)?.to_string();
        self.note_path_index.remove(&id);
        Some(id)
    }

    /// Rewrites index paths under a renamed folder prefix.
    pub fn remap_folder(&mut self, old_prefix: &str, new_prefix: &str) -> usize {
        let old = format!("{}/", old_prefix.trim_end_matches('/'));
        let new = format!("{}/", new_prefix.trim_end_matches('/'));
        let mut moved = 0;
        for entry in self.note_path_index.values_mut() {
            if let Some(rest) = entry.path.strip_prefix(&old) {
                entry.path = format!("{new}{rest}");
                moved += 1;
            }
        }
        moved
    }

    /// Queues a note id for targeted re-download. Duplicates are ignored;
    /// past [`MAX_PENDING_REFRESH`] the oldest ids fall off.
    pub fn queue_refresh(&mut self, note_id_x: &str) {
        if self.pending_refresh.iter().any(|id| id == note_id_x) {
            return;
        }
        self.pending_refresh.push(note_id_x.to_string());
        if self.pending_refresh.len() > MAX_PENDING_REFRESH {
            let overflow = self.pending_refresh.len() - MAX_PENDING_REFRESH;
            self.pending_refresh.drain(..overflow);
        }
    }

    /// Takes up to `n` queued ids, oldest first.
    pub fn drain_refresh(&mut self, n: usize) -> Vec<String> {
        let take = n.min(self.pending_refresh.len());
        self.pending_refresh.drain(..take).collect()
    }

    /// Resets sync position for a from-scratch run, keeping settings and
    /// auth intact.
    pub fn reset_for_full_resync(&mut self) {
        self.last_cursor = SyncCursor::empty();
        self.note_path_index.clear();
        self.pending_refresh.clear();
        self.data_version += 1;
    }
}

/// Durable storage for [`SyncState`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the persisted state, or the default when none exists yet.
    async fn load(&self) -> SyncResult<SyncState>;

    /// Persists the state.
    async fn save(&self, state: &SyncState) -> SyncResult<()>;
}

/// In-memory state store for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<SyncState>,
}

impl MemoryStateStore {
    /// Creates a store holding the default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `state`.
    pub fn with_state(state: SyncState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// A copy of the currently stored state.
    pub fn snapshot(&self) -> SyncState {
        self.state.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> SyncResult<SyncState> {
        Ok(self.state.lock().clone())
    }

    async fn save(&self, state: &SyncState) -> SyncResult<()> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}

/// State store backed by a JSON file on disk.
#[derive(Debug)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Creates a store persisting to `path`. The file is created on the
    /// first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self) -> SyncResult<SyncState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| SyncError::State(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SyncState::default()),
            Err(e) => Err(SyncError::State(e.to_string())),
        }
    }

    async fn save(&self, state: &SyncState) -> SyncResult<()> {
        let bytes =
            serde_json::to_vec_pretty(state).map_err(|e| SyncError::State(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::State(e.to_string()))?;
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| SyncError::State(e.to_string()))
    }
}
