//! In-process vault.
//!
//! Emits a [`VaultEvent`] for each of its own mutations, the way a host
//! would, so the mutation pipeline can be driven end to end without disk.

use super::{path, Vault, VaultEvent, VaultFile};
use crate::config::EventConfig;
use crate::error::{GalleriaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::{broadcast, RwLock};

#[derive(Debug, Clone)]
struct MemoryEntry {
    contents: Vec<u8>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl MemoryEntry {
    fn to_file(&self, path: &str) -> VaultFile {
        VaultFile {
            path: path.to_string(),
            created: self.created,
            modified: self.modified,
            size: self.contents.len() as u64,
        }
    }
}

/// Vault backed by an in-memory map.
pub struct MemoryVault {
    files: RwLock<BTreeMap<String, MemoryEntry>>,
    events: broadcast::Sender<VaultEvent>,
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVault {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EventConfig::CHANNEL_CAPACITY);
        Self {
            files: RwLock::new(BTreeMap::new()),
            events,
        }
    }

    /// Add or replace a binary file, emitting `Created` or `Modified`.
    pub async fn put(&self, path: &str, contents: impl Into<Vec<u8>>) -> VaultFile {
        let path = path::normalize(path);
        let now = Utc::now();
        let (file, existed) = {
            let mut files = self.files.write().await;
            let existed = files.contains_key(&path);
            let entry = files.entry(path.clone()).or_insert_with(|| MemoryEntry {
                contents: Vec::new(),
                created: now,
                modified: now,
            });
            entry.contents = contents.into();
            entry.modified = now;
            (entry.to_file(&path), existed)
        };
        if existed {
            self.emit(VaultEvent::Modified(file.clone()));
        } else {
            self.emit(VaultEvent::Created(file.clone()));
        }
        file
    }

    /// Override timestamps of an existing file without emitting an event.
    pub async fn set_times(
        &self,
        path: &str,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> Result<VaultFile> {
        let mut files = self.files.write().await;
        let entry = files
            .get_mut(path)
            .ok_or_else(|| GalleriaError::FileNotFound(path.to_string()))?;
        entry.created = created;
        entry.modified = modified;
        Ok(entry.to_file(path))
    }

    /// Paths currently stored, sorted.
    pub async fn paths(&self) -> Vec<String> {
        self.files.read().await.keys().cloned().collect()
    }

    fn emit(&self, event: VaultEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn list_files(&self) -> Result<Vec<VaultFile>> {
        let files = self.files.read().await;
        Ok(files.iter().map(|(p, e)| e.to_file(p)).collect())
    }

    async fn stat(&self, path: &str) -> Result<Option<VaultFile>> {
        let files = self.files.read().await;
        Ok(files.get(path).map(|e| e.to_file(path)))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.read().await;
        files
            .get(path)
            .map(|e| e.contents.clone())
            .ok_or_else(|| GalleriaError::FileNotFound(path.to_string()))
    }

    async fn create(&self, path: &str, contents: &str) -> Result<VaultFile> {
        let path = path::normalize(path);
        let file = {
            let mut files = self.files.write().await;
            if files.contains_key(&path) {
                return Err(GalleriaError::AlreadyExists(path));
            }
            let now = Utc::now();
            let entry = MemoryEntry {
                contents: contents.as_bytes().to_vec(),
                created: now,
                modified: now,
            };
            let file = entry.to_file(&path);
            files.insert(path, entry);
            file
        };
        self.emit(VaultEvent::Created(file.clone()));
        Ok(file)
    }

    async fn write_text(&self, path: &str, contents: &str) -> Result<()> {
        let file = {
            let mut files = self.files.write().await;
            let entry = files
                .get_mut(path)
                .ok_or_else(|| GalleriaError::FileNotFound(path.to_string()))?;
            entry.contents = contents.as_bytes().to_vec();
            entry.modified = Utc::now();
            entry.to_file(path)
        };
        self.emit(VaultEvent::Modified(file));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let removed = self.files.write().await.remove(path);
        match removed {
            Some(_) => {
                self.emit(VaultEvent::Deleted {
                    path: path.to_string(),
                });
                Ok(())
            }
            None => Err(GalleriaError::FileNotFound(path.to_string())),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let to = path::normalize(to);
        let file = {
            let mut files = self.files.write().await;
            if files.contains_key(&to) {
                return Err(GalleriaError::AlreadyExists(to));
            }
            let entry = files
                .remove(from)
                .ok_or_else(|| GalleriaError::FileNotFound(from.to_string()))?;
            let file = entry.to_file(&to);
            files.insert(to, entry);
            file
        };
        self.emit(VaultEvent::Renamed {
            file,
            old_path: from.to_string(),
        });
        Ok(())
    }

    fn resource_path(&self, path: &str) -> String {
        format!("memory://{}", path)
    }

    fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }
}
