//! The vault storage trait.

use crate::error::VaultResult;
use async_trait::async_trait;

/// What a vault path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultEntryKind {
    /// A regular file.
    File,
    /// A folder.
    Folder,
}

/// The host application's file/folder storage.
///
/// Paths are vault-relative, `/`-separated, without leading slashes, the
/// way note-taking hosts normalize them. None of these operations are
/// assumed synchronous.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// What exists at `path`, if anything.
    async fn kind(&self, path: &str) -> VaultResult<Option<VaultEntryKind>>;

    /// Creates a folder, including missing parents. Succeeds if the
    /// folder already exists.
    async fn create_folder(&self, path: &str) -> VaultResult<()>;

    /// Reads a file's content.
    async fn read(&self, path: &str) -> VaultResult<String>;

    /// Creates a new file. Fails if the path already exists.
    async fn create(&self, path: &str, content: &str) -> VaultResult<()>;

    /// Replaces an existing file's content.
    async fn modify(&self, path: &str, content: &str) -> VaultResult<()>;

    /// Moves a file or folder to a new path.
    async fn rename(&self, from: &str, to: &str) -> VaultResult<()>;

    /// Removes a file.
    async fn remove(&self, path: &str) -> VaultResult<()>;
}
