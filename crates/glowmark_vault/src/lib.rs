//! # Glowmark Vault
//!
//! Abstraction over the host application's file/folder storage.
//!
//! The sync core never touches the filesystem directly: it talks to a
//! [`VaultStore`], which the host implements on top of its own storage
//! API. Two implementations ship here: [`MemoryVault`] for tests and
//! [`FsVault`] for plain-directory use.
//!
//! All operations are async; the host may back them with anything from a
//! local disk to a mobile sandbox.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod fs;
mod memory;
mod path;
mod store;

pub use error::{VaultError, VaultResult};
pub use fs::FsVault;
pub use memory::MemoryVault;
pub use path::{note_file_name, parent_folder, sanitize_title, MAX_FILE_NAME_BYTES};
pub use store::{VaultEntryKind, VaultStore};
