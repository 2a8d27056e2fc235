//! Vault errors.

use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors raised by vault storage operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create targeted a path that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The underlying storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for VaultError {
    fn from(e: std::io::Error) -> Self {
        VaultError::Storage(e.to_string())
    }
}
