//! Indexed media records.

pub mod image;

use crate::config::SidecarConfig;
use crate::context::AppContext;
use crate::error::{GalleriaError, Result};
use crate::media::{DominantColor, ImageSize, MediaKind, Shape};
use crate::sidecar::{format_timestamp, FieldType, Sidecar, SidecarStore};
use crate::vault::{path, VaultFile};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_yaml::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A record shared between the index, queries and domain events.
pub type SharedRecord = Arc<RwLock<MediaRecord>>;

/// One indexed media file and its sidecar.
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub path: String,
    pub extension: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub size: u64,
    pub kind: MediaKind,
    pub sidecar: Sidecar,
}

impl MediaRecord {
    /// Build a record for `file`, creating its sidecar if needed, and bring
    /// the cached fields up to date.
    pub async fn create(ctx: &AppContext, store: &SidecarStore, file: &VaultFile) -> Result<Self> {
        let sidecar = store.create_or_get(&file.path).await?;
        let mut record = Self {
            path: file.path.clone(),
            extension: file.extension().to_string(),
            created: file.created,
            modified: file.modified,
            size: file.size,
            kind: MediaKind::from_extension(file.extension()),
            sidecar,
        };
        record.update(ctx).await?;
        Ok(record)
    }

    /// File name including extension.
    pub fn name(&self) -> &str {
        path::file_name(&self.path)
    }

    /// File name without extension.
    pub fn basename(&self) -> &str {
        path::basename(&self.path)
    }

    /// Containing folder; empty at the vault root.
    pub fn folder(&self) -> &str {
        path::parent(&self.path)
    }

    pub fn tags(&self) -> &[String] {
        self.sidecar.tags()
    }

    pub fn cached_size(&self) -> Option<ImageSize> {
        match self.kind {
            MediaKind::Image => image::read_size(&self.sidecar),
            MediaKind::Unknown => None,
        }
    }

    pub fn cached_colors(&self) -> Option<Vec<DominantColor>> {
        match self.kind {
            MediaKind::Image => image::read_colors(&self.sidecar),
            MediaKind::Unknown => None,
        }
    }

    pub fn shape(&self) -> Option<Shape> {
        self.cached_size().map(Shape::from_size)
    }

    /// Whether the sidecar's last-updated marker predates the file.
    ///
    /// Compared at millisecond precision, the precision the marker is
    /// written with.
    pub fn is_stale(&self) -> bool {
        match self.sidecar.last_updated() {
            Some(marker) => marker.timestamp_millis() < self.modified.timestamp_millis(),
            None => true,
        }
    }

    /// Re-read file metadata and sidecar, then refresh cached fields.
    ///
    /// A stale record recomputes every cached field; a fresh one only fills
    /// fields that are missing or unreadable. The last-updated marker is
    /// rewritten only when something was recomputed, so handling the
    /// resulting sidecar edit does not loop. The marker is never older than
    /// the file's mtime, so a future mtime does not leave it stale forever.
    /// Returns whether anything was recomputed.
    pub async fn update(&mut self, ctx: &AppContext) -> Result<bool> {
        let vault = ctx.vault();
        let file = vault
            .stat(&self.path)
            .await?
            .ok_or_else(|| GalleriaError::FileNotFound(self.path.clone()))?;
        self.created = file.created;
        self.modified = file.modified;
        self.size = file.size;
        self.sidecar.reload(vault).await?;

        let stale = self.is_stale();
        let computed = match self.kind {
            MediaKind::Image => image::refresh(ctx, &self.path, &mut self.sidecar, stale).await?,
            MediaKind::Unknown => false,
        };

        if stale || computed {
            debug!("Refreshed {} (stale: {})", self.path, stale);
            self.sidecar
                .set_field(
                    vault,
                    SidecarConfig::LAST_UPDATED_FIELD,
                    Value::String(format_timestamp(Utc::now().max(self.modified))),
                    Some(FieldType::DateTime),
                )
                .await;
        }
        Ok(stale || computed)
    }

    /// Point the record at a new path after a move.
    ///
    /// The sidecar path follows; moving the sidecar file is up to the
    /// caller.
    pub fn set_path(&mut self, new_path: &str) {
        self.path = new_path.to_string();
        self.extension = path::extension(new_path).to_string();
        self.kind = MediaKind::from_extension(&self.extension);
        self.sidecar.relocate(new_path);
    }

    /// Serializable view for events and CLI output.
    pub fn summary(&self, resource_path: String) -> RecordSummary {
        RecordSummary {
            path: self.path.clone(),
            name: self.basename().to_string(),
            extension: self.extension.clone(),
            kind: self.kind,
            created: self.created,
            modified: self.modified,
            size: self.cached_size(),
            tags: self.tags().to_vec(),
            resource: resource_path,
        }
    }
}

/// Flat, serializable description of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub kind: MediaKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
    pub tags: Vec<String>,
    pub resource: String,
}
