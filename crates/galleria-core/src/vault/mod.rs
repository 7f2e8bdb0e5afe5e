//! Host storage abstraction.
//!
//! The index never touches storage directly; it goes through a [`Vault`]:
//! - [`MemoryVault`] keeps everything in process (tests, embedders)
//! - [`FsVault`] maps a local directory, with [`VaultWatcher`] feeding its
//!   change notifications
//!
//! All paths are vault-relative and `/`-separated.

mod explorer;
mod fs;
mod memory;
pub mod path;
mod watcher;

pub use explorer::ExplorerPane;
pub use fs::FsVault;
pub use memory::MemoryVault;
pub use watcher::VaultWatcher;

use crate::error::{GalleriaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// A file as listed by the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultFile {
    pub path: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl VaultFile {
    /// Extension in original case, without the dot.
    pub fn extension(&self) -> &str {
        path::extension(&self.path)
    }

    /// File name without its extension.
    pub fn basename(&self) -> &str {
        path::basename(&self.path)
    }

    /// Containing folder; empty for the vault root.
    pub fn folder(&self) -> &str {
        path::parent(&self.path)
    }
}

/// Change notification emitted by a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Created(VaultFile),
    Deleted { path: String },
    Renamed { file: VaultFile, old_path: String },
    Modified(VaultFile),
}

impl VaultEvent {
    /// Path the event refers to after it happened.
    pub fn path(&self) -> &str {
        match self {
            VaultEvent::Created(file) | VaultEvent::Modified(file) => &file.path,
            VaultEvent::Renamed { file, .. } => &file.path,
            VaultEvent::Deleted { path } => path,
        }
    }
}

/// Storage the media index lives in.
#[async_trait]
pub trait Vault: Send + Sync {
    /// All files, recursively.
    async fn list_files(&self) -> Result<Vec<VaultFile>>;

    /// File metadata, `None` when the path does not exist.
    async fn stat(&self, path: &str) -> Result<Option<VaultFile>>;

    async fn exists(&self, path: &str) -> bool {
        matches!(self.stat(path).await, Ok(Some(_)))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    async fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| GalleriaError::Io {
            message: format!("{} is not valid UTF-8: {}", path, e),
            path: Some(path.into()),
            source: None,
        })
    }

    /// Create a new file; fails with [`GalleriaError::AlreadyExists`] when
    /// the path is taken.
    async fn create(&self, path: &str, contents: &str) -> Result<VaultFile>;

    /// Overwrite an existing file's text.
    async fn write_text(&self, path: &str, contents: &str) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Move a file, creating missing parent folders of the target.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Displayable locator for a file.
    fn resource_path(&self, path: &str) -> String;

    /// Receive change notifications.
    fn subscribe(&self) -> broadcast::Receiver<VaultEvent>;
}
