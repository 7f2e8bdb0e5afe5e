//! File system watcher for [`FsVault`](super::FsVault).
//!
//! Translates raw `notify` events into [`VaultEvent`]s and broadcasts them.
//! Rename halves reported separately (inotify emits `From`, `To` and then
//! `Both` sharing one tracker cookie) are paired so each rename is delivered
//! exactly once.

use super::fs::{file_from_metadata, relative_path};
use super::VaultEvent;
use crate::error::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// How long a lone rename-from waits for its partner before it counts as a
/// deletion (file moved out of the vault).
const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(250);
/// Poll interval of the translation thread.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watches a vault directory and forwards change notifications.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    stop_tx: mpsc::Sender<()>,
}

impl VaultWatcher {
    /// Start watching `root` recursively, publishing into `events`.
    pub fn new(root: impl AsRef<Path>, events: broadcast::Sender<VaultEvent>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let (event_tx, event_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

        let mut watcher = notify::recommended_watcher(event_tx)?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!("Started watching vault at {:?}", root);

        std::thread::spawn(move || {
            let mut translator = EventTranslator::new(root);
            loop {
                if stop_rx.try_recv().is_ok() {
                    debug!("Vault watcher stopping");
                    break;
                }

                let translated = match event_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(Ok(event)) => translator.translate(event, Instant::now()),
                    Ok(Err(e)) => {
                        warn!("File watcher error: {}", e);
                        Vec::new()
                    }
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => Vec::new(),
                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                        warn!("File watcher channel disconnected");
                        break;
                    }
                };

                for event in translated
                    .into_iter()
                    .chain(translator.flush_expired(Instant::now()))
                {
                    // No subscribers is fine
                    let _ = events.send(event);
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            stop_tx,
        })
    }

    /// Stop forwarding notifications.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }
}

struct PendingFrom {
    path: PathBuf,
    tracker: Option<usize>,
    seen: Instant,
}

/// Stateful mapping from `notify` events to vault events.
struct EventTranslator {
    root: PathBuf,
    pending_from: Vec<PendingFrom>,
    paired: HashSet<usize>,
}

impl EventTranslator {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            pending_from: Vec::new(),
            paired: HashSet::new(),
        }
    }

    fn translate(&mut self, event: Event, now: Instant) -> Vec<VaultEvent> {
        let tracker = event.attrs.tracker();
        match event.kind {
            EventKind::Create(_) => event
                .paths
                .iter()
                .filter_map(|p| self.file_event(p, VaultEvent::Created))
                .collect(),
            EventKind::Remove(_) => event
                .paths
                .iter()
                .filter_map(|p| self.deleted(p))
                .collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                for path in event.paths {
                    self.pending_from.push(PendingFrom {
                        path,
                        tracker,
                        seen: now,
                    });
                }
                Vec::new()
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let Some(to) = event.paths.first() else {
                    return Vec::new();
                };
                match self.take_pending(tracker) {
                    Some(from) => {
                        if let Some(t) = tracker {
                            self.paired.insert(t);
                        }
                        self.renamed(&from, to).into_iter().collect()
                    }
                    None => self
                        .file_event(to, VaultEvent::Created)
                        .into_iter()
                        .collect(),
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let Some(t) = tracker {
                    if self.paired.remove(&t) {
                        return Vec::new();
                    }
                    self.take_pending(Some(t));
                }
                match (event.paths.first(), event.paths.get(1)) {
                    (Some(from), Some(to)) => self.renamed(from, to).into_iter().collect(),
                    _ => Vec::new(),
                }
            }
            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .iter()
                .filter_map(|p| {
                    if p.exists() {
                        self.file_event(p, VaultEvent::Created)
                    } else {
                        self.deleted(p)
                    }
                })
                .collect(),
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => event
                .paths
                .iter()
                .filter_map(|p| self.file_event(p, VaultEvent::Modified))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Rename-from halves whose partner never arrived became deletions.
    fn flush_expired(&mut self, now: Instant) -> Vec<VaultEvent> {
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .pending_from
            .drain(..)
            .partition(|p| now.duration_since(p.seen) >= RENAME_PAIR_WINDOW);
        self.pending_from = kept;
        expired.iter().filter_map(|p| self.deleted(&p.path)).collect()
    }

    fn take_pending(&mut self, tracker: Option<usize>) -> Option<PathBuf> {
        let tracker = tracker?;
        let idx = self
            .pending_from
            .iter()
            .position(|p| p.tracker == Some(tracker))?;
        Some(self.pending_from.remove(idx).path)
    }

    /// Vault path of `abs`; `None` outside the root or under a
    /// dot-directory, which the vault does not list either.
    fn vault_path(&self, abs: &Path) -> Option<String> {
        relative_path(&self.root, abs).filter(|rel| !rel.split('/').any(|s| s.starts_with('.')))
    }

    fn file_event(
        &self,
        abs: &Path,
        make: fn(super::VaultFile) -> VaultEvent,
    ) -> Option<VaultEvent> {
        let meta = std::fs::metadata(abs).ok()?;
        if !meta.is_file() {
            return None;
        }
        let rel = self.vault_path(abs)?;
        Some(make(file_from_metadata(rel, &meta)))
    }

    fn deleted(&self, abs: &Path) -> Option<VaultEvent> {
        let path = self.vault_path(abs)?;
        Some(VaultEvent::Deleted { path })
    }

    fn renamed(&self, from: &Path, to: &Path) -> Option<VaultEvent> {
        let old_path = self.vault_path(from)?;
        let meta = std::fs::metadata(to).ok()?;
        if !meta.is_file() {
            return None;
        }
        let rel = self.vault_path(to)?;
        Some(VaultEvent::Renamed {
            file: file_from_metadata(rel, &meta),
            old_path,
        })
    }
}
