//! # Glowmark Sync Protocol
//!
//! Wire types for the Glowmark highlight-sync service.
//!
//! This crate provides:
//! - `SyncCursor` and the cursor reconciliation rule
//! - `TaskStatus` vocabulary for the init phase
//! - `ApiEnvelope` response unwrapping and protocol error codes
//! - `NoteEntry` / `Highlight` content records
//! - `ExportConfig` render policy
//! - Request/response bodies for init, download, ack, archive, delete
//!
//! This is a pure protocol crate with no I/O operations. All bodies are
//! JSON on the wire; field names follow the server's camelCase.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod entry;
mod error;
mod messages;
mod status;

pub use config::{ExportConfig, WriteStyle};
pub use cursor::{reconcile, Reconciled, SyncCursor};
pub use entry::{Highlight, NoteEntry};
pub use error::{is_auth_code, ProtocolError, ProtocolResult};
pub use messages::{
    AckRequest, AckResponse, ApiEnvelope, ArchiveRequest, DeleteRequest, DownloadRequest,
    DownloadResponse, InitRequest, InitResponse,
};
pub use status::TaskStatus;
