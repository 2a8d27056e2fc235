//! Request and response bodies for each sync phase.

use crate::config::ExportConfig;
use crate::cursor::SyncCursor;
use crate::entry::NoteEntry;
use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The common `{code, message, data}` envelope around every response body.
///
/// `code == 1` is success. Any other code is a structured protocol error,
/// surfaced as [`ProtocolError::Api`] rather than propagated as missing
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Server result code; 1 means success.
    pub code: i32,
    /// Human-readable message accompanying non-success codes.
    #[serde(default)]
    pub message: Option<String>,
    /// The phase-specific payload.
    #[serde(default = "none_data")]
    pub data: Option<T>,
}

fn none_data<T>() -> Option<T> {
    None
}

impl<T> ApiEnvelope<T> {
    /// Unwraps the payload, converting error codes and missing data into
    /// typed protocol errors.
    pub fn into_data(self) -> ProtocolResult<T> {
        if self.code != 1 {
            return Err(ProtocolError::Api {
                code: self.code,
                message: self
                    .message
                    .unwrap_or_else(|| "call api failed".to_string()),
            });
        }
        self.data.ok_or(ProtocolError::MissingData)
    }
}

impl<T: DeserializeOwned> ApiEnvelope<T> {
    /// Decodes an envelope from raw response bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(ProtocolError::from)
    }
}

/// Init request: opens (or polls) a server-side export task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    /// True when the local sync folder is missing; the server treats the
    /// run as a fresh full resync.
    pub note_dir_deleted: bool,
    /// True for scheduled/startup triggers, false for manual ones.
    pub auto: bool,
    /// The locally saved cursor.
    pub last_cursor: SyncCursor,
}

/// Init response: task status plus the freshest render policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitResponse {
    /// Server-computed cursor to resume from.
    pub last_cursor: SyncCursor,
    /// Render/write policy; replaces the cached config atomically.
    pub export_config: ExportConfig,
    /// Total notes in the export task.
    pub total_notes: u64,
    /// Notes prepared so far; drives the progress notice while waiting.
    pub notes_exported: u64,
    /// Raw task status string; see `TaskStatus::parse`.
    pub task_status: String,
}

/// Download request: one page of entries, by cursor or by explicit ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Cursor to page from. Ignored by the server when `note_ids` is set.
    pub last_cursor: SyncCursor,
    /// Explicit note ids for a targeted re-sync; empty for cursor mode.
    pub note_ids: Vec<String>,
    /// True for the reconcile-local-edits pass that runs before the
    /// normal incremental pass.
    pub check_update: bool,
    /// Overwrite hint for targeted reimports.
    pub overwrite: bool,
}

impl DownloadRequest {
    /// A cursor-mode page request.
    pub fn by_cursor(cursor: SyncCursor, check_update: bool) -> Self {
        Self {
            last_cursor: cursor,
            note_ids: Vec::new(),
            check_update,
            overwrite: false,
        }
    }

    /// A targeted request for specific note ids.
    pub fn by_ids(note_ids: Vec<String>, overwrite: bool) -> Self {
        Self {
            last_cursor: SyncCursor::empty(),
            note_ids,
            check_update: false,
            overwrite,
        }
    }

    /// Returns true if this is a targeted (non-paginating) request.
    pub fn is_targeted(&self) -> bool {
        !self.note_ids.is_empty()
    }
}

/// Download response: a batch of entries plus the advanced cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadResponse {
    /// Entries in this batch, in server order.
    pub entries: Vec<NoteEntry>,
    /// Cursor after this batch; equal to the request cursor when the
    /// server has nothing further.
    pub last_cursor: SyncCursor,
}

/// Ack request: acknowledges the final cursor after a completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    /// The cursor the client has durably persisted.
    pub last_cursor: SyncCursor,
}

/// Ack response carries no payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AckResponse {}

/// Archives one note on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
    /// Stable identifier of the note to archive.
    pub note_id_x: String,
}

/// Deletes one note on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Stable identifier of the note to delete.
    pub note_id_x: String,
}
