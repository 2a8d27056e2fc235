//! Engine-level errors.

use glowmark_protocol::ProtocolError;
use glowmark_template::TemplateError;
use glowmark_vault::VaultError;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while driving a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The transport could not complete a request.
    #[error("transport error: {message}")]
    Transport {
        /// What went wrong, phrased for the user-facing notice.
        message: String,
        /// Whether a later run may succeed without intervention.
        retryable: bool,
    },

    /// The server replied with a structured or malformed protocol error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The sync service subscription has expired.
    #[error("the sync service has expired")]
    ServiceExpired,

    /// The init endpoint returned a status this client does not know.
    #[error("sync failed, unrecognized task status: {0}")]
    UnknownStatus(String),

    /// Another sync run currently holds the engine.
    #[error("sync already in progress")]
    AlreadyInProgress,

    /// A template failed to compile or render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Vault storage failed.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// The persisted engine state could not be loaded or saved.
    #[error("state store error: {0}")]
    State(String),

    /// A vault path has no known note id.
    #[error("no note id recorded for {0}")]
    UnknownPath(String),
}

impl SyncError {
    /// A transport failure that a later run may recover from.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        SyncError::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// A transport failure that will repeat until something changes.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        SyncError::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the stored auth token should be cleared.
    pub fn invalidates_token(&self) -> bool {
        matches!(self, SyncError::Protocol(p) if p.invalidates_token())
    }
}
