//! Builder for configuring GalleriaApi initialization.

use std::sync::Arc;

use crate::api::GalleriaApi;
use crate::config::EventConfig;
use crate::context::AppContext;
use crate::index::MediaIndex;
use crate::media::{ImageAnalyzer, PixelAnalyzer};
use crate::pipeline::{EventBus, MutationPipeline};
use crate::settings::Settings;
use crate::vault::{ExplorerPane, Vault};

/// Builder for configuring GalleriaApi initialization.
///
/// # Example
///
/// ```rust,ignore
/// use galleria_core::{FsVault, GalleriaApi, Settings};
///
/// let api = GalleriaApi::builder(Arc::new(FsVault::new("./vault")?))
///     .settings(Settings::load(&settings_path)?)
///     .build();
/// api.start().await?;
/// ```
pub struct GalleriaApiBuilder {
    vault: Arc<dyn Vault>,
    settings: Settings,
    analyzer: Option<Arc<dyn ImageAnalyzer>>,
    pane: Option<Arc<dyn ExplorerPane>>,
    event_capacity: usize,
}

impl GalleriaApiBuilder {
    /// Create a new builder over a vault.
    pub fn new(vault: Arc<dyn Vault>) -> Self {
        Self {
            vault,
            settings: Settings::default(),
            analyzer: None,
            pane: None,
            event_capacity: EventConfig::CHANNEL_CAPACITY,
        }
    }

    /// User settings to start with.
    ///
    /// Default: [`Settings::default`]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Image analysis backend.
    ///
    /// Default: [`PixelAnalyzer`]
    pub fn analyzer(mut self, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// File-browser pane whose sidecar entries follow the hide-sidecar
    /// setting.
    pub fn explorer_pane(mut self, pane: Arc<dyn ExplorerPane>) -> Self {
        self.pane = Some(pane);
        self
    }

    /// Capacity of the domain event channel.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Build the GalleriaApi instance. Nothing is indexed until
    /// [`GalleriaApi::start`] is called.
    pub fn build(self) -> GalleriaApi {
        let analyzer = self
            .analyzer
            .unwrap_or_else(|| Arc::new(PixelAnalyzer) as Arc<dyn ImageAnalyzer>);
        let ctx = AppContext::new(self.vault, self.settings, analyzer);
        let index = Arc::new(MediaIndex::new(ctx.clone()));
        let pipeline = MutationPipeline::new(Arc::clone(&index), EventBus::new(self.event_capacity));

        GalleriaApi {
            ctx,
            index,
            pipeline,
            pane: self.pane,
            task: tokio::sync::Mutex::new(None),
        }
    }
}
