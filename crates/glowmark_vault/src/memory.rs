//! In-memory vault for tests.

use crate::error::{VaultError, VaultResult};
use crate::store::{VaultEntryKind, VaultStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, String>,
    folders: BTreeSet<String>,
}

/// An in-memory [`VaultStore`].
#[derive(Debug, Default)]
pub struct MemoryVault {
    state: RwLock<State>,
}

impl MemoryVault {
    /// Creates an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// All file paths currently in the vault, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        self.state.read().files.keys().cloned().collect()
    }

    /// Direct content access for assertions.
    pub fn content_of(&self, path: &str) -> Option<String> {
        self.state.read().files.get(path).cloned()
    }
}

#[async_trait]
impl VaultStore for MemoryVault {
    async fn kind(&self, path: &str) -> VaultResult<Option<VaultEntryKind>> {
        let state = self.state.read();
        if state.files.contains_key(path) {
            Ok(Some(VaultEntryKind::File))
        } else if state.folders.contains(path) {
            Ok(Some(VaultEntryKind::Folder))
        } else {
            Ok(None)
        }
    }

    async fn create_folder(&self, path: &str) -> VaultResult<()> {
        let mut state = self.state.write();
        let mut prefix = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            state.folders.insert(prefix.clone());
        }
        Ok(())
    }

    async fn read(&self, path: &str) -> VaultResult<String> {
        self.state
            .read()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(path.to_string()))
    }

    async fn create(&self, path: &str, content: &str) -> VaultResult<()> {
        let mut state = self.state.write();
        if state.files.contains_key(path) {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        state.files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn modify(&self, path: &str, content: &str) -> VaultResult<()> {
        let mut state = self.state.write();
        match state.files.get_mut(path) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(VaultError::NotFound(path.to_string())),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> VaultResult<()> {
        let mut state = self.state.write();
        if let Some(content) = state.files.remove(from) {
            state.files.insert(to.to_string(), content);
            return Ok(());
        }
        if state.folders.remove(from) {
            state.folders.insert(to.to_string());
            let prefix = format!("{from}/");
            let moved: Vec<(String, String)> = state
                .files
                .range(prefix.clone()..)
                .take_while(|(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (old, content) in moved {
                let new = format!("{to}/{}", &old[prefix.len()..]);
                state.files.remove(&old);
                state.files.insert(new, content);
            }
            // Nested subfolders move with their parent.
            let nested: Vec<String> = state
                .folders
                .range(prefix.clone()..)
                .take_while(|f| f.starts_with(&prefix))
                .cloned()
                .collect();
            for old in nested {
                let new = format!("{to}/{}", &old[prefix.len()..]);
                state.folders.remove(&old);
                state.folders.insert(new);
            }
            return Ok(());
        }
        Err(VaultError::NotFound(from.to_string()))
    }

    async fn remove(&self, path: &str) -> VaultResult<()> {
        let mut state = self.state.write();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| VaultError::NotFound(path.to_string()))
    }
}
