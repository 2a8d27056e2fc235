//! Filesystem-backed vault.

use crate::error::{VaultError, VaultResult};
use crate::store::{VaultEntryKind, VaultStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A [`VaultStore`] rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    /// Creates a vault rooted at `root`. The directory must exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The vault root on disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl VaultStore for FsVault {
    async fn kind(&self, path: &str) -> VaultResult<Option<VaultEntryKind>> {
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(meta) if meta.is_dir() => Ok(Some(VaultEntryKind::Folder)),
            Ok(_) => Ok(Some(VaultEntryKind::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_folder(&self, path: &str) -> VaultResult<()> {
        tokio::fs::create_dir_all(self.resolve(path)).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> VaultResult<String> {
        match tokio::fs::read_to_string(self.resolve(path)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, path: &str, content: &str) -> VaultResult<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::try_exists(&full).await? {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        tokio::fs::write(&full, content).await?;
        Ok(())
    }

    async fn modify(&self, path: &str, content: &str) -> VaultResult<()> {
        let full = self.resolve(path);
        if !tokio::fs::try_exists(&full).await? {
            return Err(VaultError::NotFound(path.to_string()));
        }
        tokio::fs::write(&full, content).await?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> VaultResult<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::rename(self.resolve(from), target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(from.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, path: &str) -> VaultResult<()> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
