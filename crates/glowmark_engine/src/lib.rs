//! # Glowmark Engine
//!
//! Drives the cursor-based sync protocol end to end: init polling while
//! the server prepares an export, paged downloads, idempotent file
//! materialization through the template layer, and best-effort cursor
//! acknowledgement. The host supplies the seams (vault storage, template
//! engine, HTTP client, notices, state persistence); the engine owns the
//! phase machine and every protocol decision.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glowmark_engine::{
//!     EngineConfig, MemoryNotifier, MemoryStateStore, MockTransport, SyncEngine,
//! };
//! use glowmark_template::{RenderContext, TemplateEngine, TemplateResult};
//! use glowmark_vault::MemoryVault;
//!
//! struct NullEngine;
//! impl TemplateEngine for NullEngine {
//!     fn compile(&self, _id: &str, _source: &str) -> TemplateResult<()> {
//!         Ok(())
//!     }
//!     fn render(&self, _id: &str, _ctx: &RenderContext) -> TemplateResult<String> {
//!         Ok(String::new())
//!     }
//!     fn has_template(&self, _id: &str) -> bool {
//!         true
//!     }
//! }
//!
//! let engine = SyncEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(MockTransport::new()),
//!     Arc::new(MemoryVault::new()),
//!     Arc::new(NullEngine),
//!     Arc::new(MemoryStateStore::new()),
//!     Arc::new(MemoryNotifier::new()),
//! );
//! assert_eq!(engine.phase(), glowmark_engine::SyncPhase::Idle);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod http;
mod materializer;
mod notify;
mod state;
mod transport;

pub use config::EngineConfig;
pub use engine::{SyncEngine, SyncPhase};
pub use error::{SyncError, SyncResult};
pub use http::{ClientIdent, HttpClient, HttpResponse, HttpTransport};
pub use materializer::{build_context, EntryMaterializer};
pub use notify::{MemoryNotifier, Notice, Notifier, TracingNotifier};
pub use state::{
    JsonStateStore, MemoryStateStore, NotePathEntry, StateStore, SyncState, MAX_PENDING_REFRESH,
};
pub use transport::{MockTransport, SyncTransport};
