//! Shared application context.

use crate::media::ImageAnalyzer;
use crate::settings::Settings;
use crate::vault::Vault;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Collaborators shared by the index, sidecar store, pipeline and queries.
///
/// Cloning is cheap; all clones see the same vault, settings and analyzer.
#[derive(Clone)]
pub struct AppContext {
    vault: Arc<dyn Vault>,
    settings: Arc<RwLock<Settings>>,
    analyzer: Arc<dyn ImageAnalyzer>,
}

impl AppContext {
    pub fn new(vault: Arc<dyn Vault>, settings: Settings, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        Self {
            vault,
            settings: Arc::new(RwLock::new(settings.normalized())),
            analyzer,
        }
    }

    pub fn vault(&self) -> &dyn Vault {
        self.vault.as_ref()
    }

    pub fn analyzer(&self) -> Arc<dyn ImageAnalyzer> {
        Arc::clone(&self.analyzer)
    }

    /// Snapshot of the current settings.
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Replace the settings, returning the previous value.
    pub async fn replace_settings(&self, settings: Settings) -> Settings {
        let mut guard = self.settings.write().await;
        std::mem::replace(&mut *guard, settings.normalized())
    }

    pub async fn tracks(&self, extension: &str) -> bool {
        self.settings.read().await.tracks(extension)
    }
}
