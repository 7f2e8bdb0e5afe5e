//! Application facade tying the index, pipeline and queries together.

mod builder;

pub use builder::GalleriaApiBuilder;

use crate::config::SidecarConfig;
use crate::context::AppContext;
use crate::error::Result;
use crate::index::{BuildProgress, IndexCounts, IndexState, MediaIndex};
use crate::pipeline::{MediaEvent, MutationPipeline};
use crate::query::{Query, QueryDetails};
use crate::record::MediaRecord;
use crate::settings::Settings;
use crate::vault::{path, ExplorerPane, Vault};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Main entry point for embedding Galleria.
///
/// Created through [`GalleriaApi::builder`]. Call [`start`](Self::start) to
/// build the index and begin following vault notifications.
pub struct GalleriaApi {
    pub(crate) ctx: AppContext,
    pub(crate) index: Arc<MediaIndex>,
    pub(crate) pipeline: MutationPipeline,
    pub(crate) pane: Option<Arc<dyn ExplorerPane>>,
    /// Running pipeline task, if started.
    pub(crate) task: Mutex<Option<JoinHandle<()>>>,
}

impl GalleriaApi {
    pub fn builder(vault: Arc<dyn Vault>) -> GalleriaApiBuilder {
        GalleriaApiBuilder::new(vault)
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Build the index and start the mutation pipeline.
    ///
    /// The pipeline subscribes before the build begins, so notifications
    /// raised while building are handled once the index is ready. Calling
    /// this again while running only re-applies sidecar visibility.
    pub async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_none() {
            let receiver = self.ctx.vault().subscribe();
            self.index.initialize().await?;

            let pipeline = self.pipeline.clone();
            *task = Some(tokio::spawn(async move { pipeline.run(receiver).await }));
            info!("Galleria started with {} records", self.index.len().await);
        }
        drop(task);

        self.apply_visibility().await;
        Ok(())
    }

    /// Stop following vault notifications. The index stays as it is.
    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            debug!("Mutation pipeline stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ========================================
    // Queries
    // ========================================

    /// Run a search, waiting for the index first.
    pub async fn search(&self, details: QueryDetails) -> Result<Vec<MediaRecord>> {
        Query::new(Arc::clone(&self.index), details)?.get_items().await
    }

    pub fn index(&self) -> &Arc<MediaIndex> {
        &self.index
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn state(&self) -> IndexState {
        self.index.state()
    }

    pub async fn counts(&self) -> IndexCounts {
        self.index.counts().await
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<BuildProgress> {
        self.index.subscribe_progress()
    }

    /// Receive domain events published by the pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.pipeline.bus().subscribe()
    }

    /// Displayable locator for a vault path.
    pub fn resource_path(&self, path: &str) -> String {
        self.ctx.vault().resource_path(path)
    }

    // ========================================
    // Settings
    // ========================================

    pub async fn settings(&self) -> Settings {
        self.ctx.settings().await
    }

    /// Replace the settings.
    ///
    /// A changed set of tracked extensions re-synchronizes the index; a
    /// changed hide-sidecar flag is re-applied to the explorer pane.
    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        let previous = self.ctx.replace_settings(settings).await;
        let current = self.ctx.settings().await;

        if extension_set(&previous) != extension_set(&current) {
            info!(
                "Tracked extensions changed to [{}]",
                current.extensions.join(", ")
            );
            self.index.update_extensions().await?;
        }
        if previous.hide_sidecar != current.hide_sidecar {
            self.apply_visibility().await;
        }
        Ok(())
    }

    // ========================================
    // Sidecar maintenance
    // ========================================

    /// Apply the hide-sidecar setting to every indexed sidecar in `pane`.
    pub async fn hide_sidecars(&self, pane: &dyn ExplorerPane) -> usize {
        self.index.hide_all(pane).await
    }

    /// Delete the sidecar of every non-document file in the vault.
    ///
    /// The pipeline is stopped first so the deletions are not healed. The
    /// index keeps its records but no longer matches the vault; this is
    /// meant for removing all Galleria data, not as part of normal use.
    pub async fn delete_all_sidecars(&self) -> Result<usize> {
        self.stop().await;

        let store = self.index.store();
        let mut deleted = 0;
        for file in self.ctx.vault().list_files().await? {
            if path::extension(&file.path).eq_ignore_ascii_case(SidecarConfig::DOCUMENT_EXTENSION) {
                continue;
            }
            if store.delete(&file.path).await {
                deleted += 1;
            }
        }
        info!("Deleted {} sidecars", deleted);
        Ok(deleted)
    }

    async fn apply_visibility(&self) {
        if let Some(pane) = &self.pane {
            self.index.hide_all(pane.as_ref()).await;
        }
    }
}

impl Drop for GalleriaApi {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

fn extension_set(settings: &Settings) -> Vec<String> {
    let mut extensions = settings.extensions.clone();
    extensions.sort();
    extensions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingAnalyzer;
    use crate::vault::MemoryVault;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingPane {
        hidden: StdMutex<Vec<(String, bool)>>,
    }

    impl ExplorerPane for RecordingPane {
        fn set_hidden(&self, path: &str, hidden: bool) -> bool {
            self.hidden
                .lock()
                .unwrap()
                .push((path.to_string(), hidden));
            true
        }
    }

    /// Next event with the given name; sidecar edits from the initial
    /// build may still be queued ahead of it.
    async fn next_named(events: &mut broadcast::Receiver<MediaEvent>, name: &str) -> MediaEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out waiting for event")
                .unwrap();
            if event.name() == name {
                return event;
            }
        }
    }

    async fn api_with(vault: Arc<MemoryVault>) -> GalleriaApi {
        GalleriaApi::builder(vault)
            .analyzer(Arc::new(CountingAnalyzer::new(8, 8)))
            .build()
    }

    #[tokio::test]
    async fn test_start_builds_and_follows_vault() {
        let vault = Arc::new(MemoryVault::new());
        vault.put("a.png", vec![1u8]).await;
        let api = api_with(vault.clone()).await;

        api.start().await.unwrap();
        assert_eq!(api.state(), IndexState::Ready);
        assert!(api.is_running().await);
        assert_eq!(api.index().len().await, 1);

        let mut events = api.subscribe();
        vault.put("b.jpg", vec![1u8]).await;
        let event = next_named(&mut events, "file-created").await;
        assert_eq!(event.record().path, "b.jpg");

        let found = api.search(QueryDetails::default()).await.unwrap();
        let paths: Vec<_> = found.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a.png", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_stop_detaches_pipeline() {
        let vault = Arc::new(MemoryVault::new());
        let api = api_with(vault.clone()).await;
        api.start().await.unwrap();
        api.stop().await;
        assert!(!api.is_running().await);

        vault.put("late.png", vec![1u8]).await;
        tokio::task::yield_now().await;
        assert!(!api.index().contains("late.png").await);
    }

    #[tokio::test]
    async fn test_update_settings_resyncs_extensions() {
        let vault = Arc::new(MemoryVault::new());
        vault.put("a.png", vec![1u8]).await;
        vault.put("clip.mp4", vec![1u8]).await;
        let api = api_with(vault).await;
        api.start().await.unwrap();
        assert!(!api.index().contains("clip.mp4").await);

        let mut settings = api.settings().await;
        settings.extensions = vec!["MP4".into(), ".png".into()];
        api.update_settings(settings).await.unwrap();

        assert!(api.index().contains("clip.mp4").await);
        assert_eq!(api.counts().await.extensions.get("mp4"), 1);
    }

    #[tokio::test]
    async fn test_hide_setting_reaches_registered_pane() {
        let vault = Arc::new(MemoryVault::new());
        vault.put("a.png", vec![1u8]).await;
        let pane = Arc::new(RecordingPane::default());
        let api = GalleriaApi::builder(vault)
            .analyzer(Arc::new(CountingAnalyzer::new(8, 8)))
            .explorer_pane(pane.clone())
            .build();
        api.start().await.unwrap();

        let mut settings = api.settings().await;
        settings.hide_sidecar = true;
        api.update_settings(settings).await.unwrap();

        let calls = pane.hidden.lock().unwrap().clone();
        assert_eq!(calls.last(), Some(&("a.png.sidecar.md".to_string(), true)));
    }

    #[tokio::test]
    async fn test_delete_all_sidecars() {
        let vault = Arc::new(MemoryVault::new());
        vault.put("a.png", vec![1u8]).await;
        vault.put("x/b.png", vec![1u8]).await;
        vault.put("notes.md", "# notes").await;
        let api = api_with(vault.clone()).await;
        api.start().await.unwrap();
        assert!(vault.exists("x/b.png.sidecar.md").await);

        assert_eq!(api.delete_all_sidecars().await.unwrap(), 2);
        assert!(!api.is_running().await);
        assert!(!vault.exists("a.png.sidecar.md").await);
        assert!(!vault.exists("x/b.png.sidecar.md").await);
        assert!(vault.exists("notes.md").await);
    }
}
