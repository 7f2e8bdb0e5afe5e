//! Creation, lookup and lifecycle of sidecar files.

use super::{sidecar_path, Sidecar};
use crate::context::AppContext;
use crate::error::Result;
use tracing::{debug, warn};

/// Resolves sidecars for media paths, creating them on demand.
#[derive(Clone)]
pub struct SidecarStore {
    ctx: AppContext,
}

impl SidecarStore {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Return the sidecar of `media_path`, creating it from the configured
    /// template when absent.
    ///
    /// Losing a creation race to another caller is not an error: the file
    /// that won is loaded instead.
    pub async fn create_or_get(&self, media_path: &str) -> Result<Sidecar> {
        let path = sidecar_path(media_path);
        let vault = self.ctx.vault();

        if vault.exists(&path).await {
            return self.load(&path).await;
        }

        let template = self.ctx.settings().await.sidecar_template;
        match vault.create(&path, &template).await {
            Ok(file) => {
                debug!("Created sidecar {}", path);
                Ok(Sidecar::from_text(path, file.modified, &template))
            }
            Err(e) if e.is_already_exists() => {
                debug!("Sidecar {} appeared concurrently, loading it", path);
                self.load(&path).await
            }
            Err(e) => Err(e),
        }
    }

    async fn load(&self, path: &str) -> Result<Sidecar> {
        let vault = self.ctx.vault();
        let text = vault.read_text(path).await?;
        let modified = vault
            .stat(path)
            .await?
            .map(|file| file.modified)
            .unwrap_or_else(chrono::Utc::now);
        Ok(Sidecar::from_text(path, modified, &text))
    }

    /// Delete the sidecar of `media_path` if there is one.
    ///
    /// Returns whether a file was removed; failures are logged.
    pub async fn delete(&self, media_path: &str) -> bool {
        let path = sidecar_path(media_path);
        let vault = self.ctx.vault();
        if !vault.exists(&path).await {
            return false;
        }
        match vault.delete(&path).await {
            Ok(()) => {
                debug!("Deleted sidecar {}", path);
                true
            }
            Err(e) => {
                warn!("Failed to delete sidecar {}: {}", path, e);
                false
            }
        }
    }

    /// Move the sidecar of `old_media` alongside `new_media`.
    ///
    /// Best effort: a missing source, an occupied target or a host failure
    /// is logged and reported as `false`.
    pub async fn rename(&self, old_media: &str, new_media: &str) -> bool {
        let from = sidecar_path(old_media);
        let to = sidecar_path(new_media);
        let vault = self.ctx.vault();
        if !vault.exists(&from).await {
            debug!("No sidecar at {} to move", from);
            return false;
        }
        match vault.rename(&from, &to).await {
            Ok(()) => {
                debug!("Moved sidecar {} -> {}", from, to);
                true
            }
            Err(e) => {
                warn!("Failed to move sidecar {} -> {}: {}", from, to, e);
                false
            }
        }
    }
}
