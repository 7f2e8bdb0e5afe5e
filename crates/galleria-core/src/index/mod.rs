//! In-memory media index.
//!
//! Holds one [`MediaRecord`] per tracked file plus aggregate counters over
//! folders, tags and extensions. Whole-index operations (build, extension
//! resync) are serialized by a build lock; readiness is published through a
//! `watch` channel so waiters never observe a half-built index.

mod counts;

pub use counts::{CountMap, IndexCounts};

use crate::config::IndexConfig;
use crate::context::AppContext;
use crate::error::{GalleriaError, Result};
use crate::record::{MediaRecord, SharedRecord};
use crate::sidecar::{media_path_for, SidecarStore};
use crate::vault::{path, ExplorerPane, VaultFile};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Lifecycle of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Empty,
    Building,
    Ready,
    /// Re-synchronizing after the tracked extensions changed.
    Updating,
}

/// Progress of the current build or resync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildProgress {
    pub processed: usize,
    pub total: usize,
}

impl BuildProgress {
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

#[derive(Default)]
struct IndexInner {
    records: BTreeMap<String, SharedRecord>,
    counts: IndexCounts,
}

/// The media index.
pub struct MediaIndex {
    ctx: AppContext,
    store: SidecarStore,
    state: watch::Sender<IndexState>,
    progress: watch::Sender<BuildProgress>,
    build_lock: Mutex<()>,
    inner: RwLock<IndexInner>,
}

impl MediaIndex {
    pub fn new(ctx: AppContext) -> Self {
        let store = SidecarStore::new(ctx.clone());
        let (state, _) = watch::channel(IndexState::Empty);
        let (progress, _) = watch::channel(BuildProgress::default());
        Self {
            ctx,
            store,
            state,
            progress,
            build_lock: Mutex::new(()),
            inner: RwLock::new(IndexInner::default()),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn store(&self) -> &SidecarStore {
        &self.store
    }

    pub fn state(&self) -> IndexState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<IndexState> {
        self.state.subscribe()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<BuildProgress> {
        self.progress.subscribe()
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Build the index if it has not been built yet.
    ///
    /// Concurrent callers wait for the build in progress instead of
    /// starting another one; a call on a ready index returns immediately.
    pub async fn initialize(&self) -> Result<()> {
        if self.state() == IndexState::Ready {
            return Ok(());
        }

        let _guard = self.build_lock.lock().await;
        if self.state() == IndexState::Ready {
            return Ok(());
        }

        self.state.send_replace(IndexState::Building);
        match self.build().await {
            Ok(_) => {
                self.state.send_replace(IndexState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!("Media index build failed: {}", e);
                self.state.send_replace(IndexState::Empty);
                Err(e)
            }
        }
    }

    /// Initialize, then wait until the index is ready (including the end
    /// of an extension resync).
    pub async fn await_ready(&self) -> Result<()> {
        self.initialize().await?;
        let mut rx = self.state.subscribe();
        rx.wait_for(|state| *state == IndexState::Ready)
            .await
            .map(|_| ())
            .map_err(|_| GalleriaError::Other("index state channel closed".into()))
    }

    async fn build(&self) -> Result<usize> {
        let started = Instant::now();
        info!("Building media index");

        let files = self.tracked_files().await?;
        let total = files.len();
        let added = self.add_files(files).await;

        info!(
            "Built media index with {} of {} files in {:?}",
            added,
            total,
            started.elapsed()
        );
        Ok(added)
    }

    /// Vault files whose extension is currently tracked.
    async fn tracked_files(&self) -> Result<Vec<VaultFile>> {
        let settings = self.ctx.settings().await;
        let files = self.ctx.vault().list_files().await?;
        Ok(files
            .into_iter()
            .filter(|file| settings.tracks(file.extension()))
            .collect())
    }

    /// Construct records concurrently and add them. Files that fail are
    /// logged and skipped; progress still reaches the total.
    async fn add_files(&self, files: Vec<VaultFile>) -> usize {
        let total = files.len();
        self.progress
            .send_replace(BuildProgress { processed: 0, total });

        let ctx = &self.ctx;
        let store = &self.store;
        let mut results = stream::iter(files)
            .map(|file| async move {
                let result = MediaRecord::create(ctx, store, &file).await;
                (file.path, result)
            })
            .buffer_unordered(IndexConfig::BUILD_CONCURRENCY);

        let mut processed = 0;
        let mut added = 0;
        while let Some((path, result)) = results.next().await {
            processed += 1;
            match result {
                Ok(record) => {
                    if self.contains(&path).await {
                        debug!("{} was indexed concurrently, keeping existing record", path);
                    } else {
                        self.add_file(record).await;
                        added += 1;
                    }
                }
                Err(e) => warn!("Skipping {}: {}", path, e),
            }
            self.progress
                .send_replace(BuildProgress { processed, total });
        }
        added
    }

    /// Re-synchronize after the tracked extensions changed.
    ///
    /// Records with untracked extensions are dropped, newly tracked files
    /// are added, everything else is left alone. Runs under the build lock,
    /// so it waits for a build in progress. No-op unless the index is ready.
    pub async fn update_extensions(&self) -> Result<()> {
        let _guard = self.build_lock.lock().await;
        if self.state() != IndexState::Ready {
            debug!("Index not built yet, extension change applies on build");
            return Ok(());
        }

        self.state.send_replace(IndexState::Updating);
        let result = self.resync_extensions().await;
        self.state.send_replace(IndexState::Ready);
        result
    }

    async fn resync_extensions(&self) -> Result<()> {
        let settings = self.ctx.settings().await;

        let untracked: Vec<String> = {
            let inner = self.inner.read().await;
            inner
                .records
                .keys()
                .filter(|p| !settings.tracks(path::extension(p)))
                .cloned()
                .collect()
        };
        for p in &untracked {
            self.remove_file(p).await;
        }

        let mut files = self.tracked_files().await?;
        {
            let inner = self.inner.read().await;
            files.retain(|file| !inner.records.contains_key(&file.path));
        }
        let added = self.add_files(files).await;

        info!(
            "Tracked extensions changed: dropped {}, added {}",
            untracked.len(),
            added
        );
        Ok(())
    }

    // ========================================
    // Record mutation
    // ========================================

    /// Add a record and count it. A record already stored under the same
    /// path is replaced and uncounted.
    pub async fn add_file(&self, record: MediaRecord) -> SharedRecord {
        let mut inner = self.inner.write().await;
        inner.counts.add_record(&record);

        let path = record.path.clone();
        let shared = Arc::new(RwLock::new(record));
        if let Some(previous) = inner.records.insert(path, Arc::clone(&shared)) {
            let previous = previous.read().await;
            inner.counts.remove_record(&previous);
        }
        shared
    }

    /// Remove and uncount the record at `path`, returning it.
    pub async fn take_file(&self, path: &str) -> Option<SharedRecord> {
        let mut inner = self.inner.write().await;
        let shared = inner.records.remove(path)?;
        {
            let record = shared.read().await;
            inner.counts.remove_record(&record);
        }
        Some(shared)
    }

    /// Remove the record at `path`; returns whether one was removed.
    pub async fn remove_file(&self, path: &str) -> bool {
        self.take_file(path).await.is_some()
    }

    /// Re-key the record at `old_path` under `new_path` and move its folder
    /// counts. Tags are unaffected; the extension count only moves when
    /// the extension itself changed.
    pub async fn file_moved(&self, old_path: &str, new_path: &str) -> Option<SharedRecord> {
        let mut inner = self.inner.write().await;
        let shared = inner.records.remove(old_path)?;
        {
            let mut record = shared.write().await;
            let old_extension = record.extension.to_lowercase();
            record.set_path(new_path);

            let counts = &mut inner.counts;
            counts.paths.remove_hierarchy(path::parent(old_path));
            counts.paths.add_hierarchy(record.folder());

            let new_extension = record.extension.to_lowercase();
            if new_extension != old_extension {
                counts.extensions.decrement(&old_extension);
                counts.extensions.increment(&new_extension);
            }
        }

        if let Some(previous) = inner
            .records
            .insert(new_path.to_string(), Arc::clone(&shared))
        {
            let previous = previous.read().await;
            inner.counts.remove_record(&previous);
        }
        Some(shared)
    }

    /// Rebuild all tag counts from the records' current sidecars.
    ///
    /// Tag sets are not diffed, so any sidecar change triggers a full pass.
    pub async fn sidecar_updated(&self) {
        let mut inner = self.inner.write().await;
        let mut tags = CountMap::default();
        for shared in inner.records.values() {
            let record = shared.read().await;
            for tag in record.tags() {
                tags.add_hierarchy(tag);
            }
        }
        inner.counts.tags = tags;
    }

    // ========================================
    // Lookup
    // ========================================

    pub async fn get(&self, path: &str) -> Option<SharedRecord> {
        self.inner.read().await.records.get(path).cloned()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.inner.read().await.records.contains_key(path)
    }

    /// Snapshot of the current records, ordered by path.
    pub async fn records(&self) -> Vec<SharedRecord> {
        self.inner.read().await.records.values().cloned().collect()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.inner.read().await.records.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the aggregate counters.
    pub async fn counts(&self) -> IndexCounts {
        self.inner.read().await.counts.clone()
    }

    /// A path is a sidecar when it carries the sidecar suffix and the
    /// remainder is an indexed media path.
    pub async fn is_sidecar_path(&self, path: &str) -> bool {
        match media_path_for(path) {
            Some(media) => self.contains(media).await,
            None => false,
        }
    }

    /// Apply the hide-sidecar setting to every indexed sidecar in `pane`.
    /// Returns how many entries were found in the pane.
    pub async fn hide_all(&self, pane: &dyn ExplorerPane) -> usize {
        let hide = self.ctx.settings().await.hide_sidecar;
        let mut applied = 0;
        for shared in self.records().await {
            if shared.read().await.sidecar.hide(pane, hide) {
                applied += 1;
            }
        }
        debug!("Applied sidecar visibility to {} entries", applied);
        applied
    }

    #[cfg(test)]
    pub(crate) async fn clear_counts(&self) {
        let mut inner = self.inner.write().await;
        inner.counts.paths.clear();
        inner.counts.tags.clear();
        inner.counts.extensions.clear();
    }
}
