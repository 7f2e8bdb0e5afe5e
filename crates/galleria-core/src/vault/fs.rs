//! Vault over a local directory.

use super::{path, Vault, VaultEvent, VaultFile, VaultWatcher};
use crate::config::EventConfig;
use crate::error::{GalleriaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::debug;
use walkdir::WalkDir;

/// Vault rooted at a directory on disk.
///
/// Dot-directories (`.git`, `.obsidian`, ...) are not listed. Change
/// notifications only flow once [`FsVault::watch`] has been called.
pub struct FsVault {
    root: PathBuf,
    events: broadcast::Sender<VaultEvent>,
}

impl FsVault {
    /// Open an existing directory as a vault.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| GalleriaError::io_with_path(e, root))?;
        if !root.is_dir() {
            return Err(GalleriaError::Config {
                message: format!("Vault root is not a directory: {}", root.display()),
            });
        }
        let (events, _) = broadcast::channel(EventConfig::CHANNEL_CAPACITY);
        Ok(Self { root, events })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a vault path.
    pub fn absolute(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    /// Start forwarding file system notifications to subscribers.
    ///
    /// Notifications stop when the returned watcher is dropped or stopped.
    pub fn watch(&self) -> Result<VaultWatcher> {
        VaultWatcher::new(&self.root, self.events.clone())
    }

    async fn ensure_parent(&self, abs: &Path) -> Result<()> {
        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GalleriaError::io_with_path(e, parent))?;
        }
        Ok(())
    }
}

/// Vault path for an absolute location under `root`.
pub(crate) fn relative_path(root: &Path, abs: &Path) -> Option<String> {
    let rel = abs.strip_prefix(root).ok()?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    (!joined.is_empty()).then_some(joined)
}

pub(crate) fn file_from_metadata(rel: String, meta: &std::fs::Metadata) -> VaultFile {
    let modified: DateTime<Utc> = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let created: DateTime<Utc> = meta
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified);
    VaultFile {
        path: rel,
        created,
        modified,
        size: meta.len(),
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

#[async_trait]
impl Vault for FsVault {
    async fn list_files(&self) -> Result<Vec<VaultFile>> {
        let root = self.root.clone();
        let files = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .min_depth(1)
                .into_iter()
                .filter_entry(|e| !is_hidden(e))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| {
                    let rel = relative_path(&root, e.path())?;
                    let meta = e.metadata().ok()?;
                    Some(file_from_metadata(rel, &meta))
                })
                .collect::<Vec<_>>()
        })
        .await?;
        debug!("Listed {} files under {}", files.len(), self.root.display());
        Ok(files)
    }

    async fn stat(&self, path: &str) -> Result<Option<VaultFile>> {
        let abs = self.absolute(path);
        match tokio::fs::metadata(&abs).await {
            Ok(meta) if meta.is_file() => Ok(Some(file_from_metadata(path.to_string(), &meta))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GalleriaError::io_with_path(e, abs)),
        }
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let abs = self.absolute(path);
        tokio::fs::read(&abs).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GalleriaError::FileNotFound(path.to_string())
            } else {
                GalleriaError::io_with_path(e, &abs)
            }
        })
    }

    async fn create(&self, path: &str, contents: &str) -> Result<VaultFile> {
        let path = path::normalize(path);
        let abs = self.absolute(&path);
        self.ensure_parent(&abs).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs)
            .await
            .map_err(|e| GalleriaError::io_with_path(e, &abs))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| GalleriaError::io_with_path(e, &abs))?;
        file.flush()
            .await
            .map_err(|e| GalleriaError::io_with_path(e, &abs))?;

        self.stat(&path)
            .await?
            .ok_or(GalleriaError::FileNotFound(path))
    }

    async fn write_text(&self, path: &str, contents: &str) -> Result<()> {
        let abs = self.absolute(path);
        if !abs.is_file() {
            return Err(GalleriaError::FileNotFound(path.to_string()));
        }
        tokio::fs::write(&abs, contents)
            .await
            .map_err(|e| GalleriaError::io_with_path(e, &abs))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let abs = self.absolute(path);
        tokio::fs::remove_file(&abs).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GalleriaError::FileNotFound(path.to_string())
            } else {
                GalleriaError::io_with_path(e, &abs)
            }
        })
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_abs = self.absolute(from);
        let to_abs = self.absolute(&path::normalize(to));
        if tokio::fs::try_exists(&to_abs).await.unwrap_or(false) {
            return Err(GalleriaError::AlreadyExists(to.to_string()));
        }
        self.ensure_parent(&to_abs).await?;
        tokio::fs::rename(&from_abs, &to_abs)
            .await
            .map_err(|e| GalleriaError::io_with_path(e, &from_abs))
    }

    fn resource_path(&self, path: &str) -> String {
        let abs = self.absolute(path);
        url::Url::from_file_path(&abs)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| abs.display().to_string())
    }

    fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }
}
