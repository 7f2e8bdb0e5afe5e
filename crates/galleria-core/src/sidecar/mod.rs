//! Sidecar documents: one markdown companion per media file.
//!
//! A sidecar lives at `<media path>.sidecar.md` and carries the media's
//! tags, user fields and the cached values derived from the media itself.

mod field;
mod frontmatter;
mod store;

pub use field::{format_timestamp, parse_timestamp, FieldType};
pub use frontmatter::{normalize_tag, FrontMatterDocument};
pub use store::SidecarStore;

use crate::config::SidecarConfig;
use crate::error::{GalleriaError, Result};
use crate::vault::{ExplorerPane, Vault};
use chrono::{DateTime, Utc};
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

/// Derived sidecar path for a media file.
pub fn sidecar_path(media_path: &str) -> String {
    format!("{}{}", media_path, SidecarConfig::SUFFIX)
}

/// Media path a sidecar path belongs to, if it carries the suffix.
pub fn media_path_for(sidecar_path: &str) -> Option<&str> {
    sidecar_path
        .strip_suffix(SidecarConfig::SUFFIX)
        .filter(|media| !media.is_empty())
}

/// In-memory view of a sidecar document.
#[derive(Debug, Clone)]
pub struct Sidecar {
    path: String,
    modified: DateTime<Utc>,
    document: FrontMatterDocument,
    tags: Vec<String>,
}

impl Sidecar {
    /// Build from raw text. Malformed front matter is logged and read as
    /// an empty field set so the record stays usable.
    pub(crate) fn from_text(path: impl Into<String>, modified: DateTime<Utc>, text: &str) -> Self {
        let path = path.into();
        let document = match FrontMatterDocument::parse(text) {
            Ok(document) => document,
            Err(e) => {
                warn!("Ignoring malformed front matter in {}: {}", path, e);
                FrontMatterDocument {
                    fields: Mapping::new(),
                    body: text.to_string(),
                }
            }
        };
        let tags = document.tags();
        Self {
            path,
            modified,
            document,
            tags,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of the owning media file.
    pub fn media_path(&self) -> &str {
        media_path_for(&self.path).unwrap_or(&self.path)
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Normalized tags, front matter first, then inline markers.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.document.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.document.fields.contains_key(name)
    }

    pub fn fields(&self) -> &Mapping {
        &self.document.fields
    }

    /// Front-matter fields that are not maintained by the index.
    pub fn user_fields(&self) -> Mapping {
        self.document
            .fields
            .iter()
            .filter(|(key, _)| {
                key.as_str()
                    .map(|k| !SidecarConfig::RESERVED_FIELDS.contains(&k))
                    .unwrap_or(true)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn body(&self) -> &str {
        &self.document.body
    }

    /// Time the owning record last refreshed its cached fields.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.get_field(SidecarConfig::LAST_UPDATED_FIELD)
            .and_then(parse_timestamp)
    }

    /// Follow the owning media file to `media_path`.
    pub(crate) fn relocate(&mut self, media_path: &str) {
        self.path = sidecar_path(media_path);
    }

    /// Re-read the document from the vault.
    pub async fn reload(&mut self, vault: &dyn Vault) -> Result<()> {
        let text = vault.read_text(&self.path).await?;
        let modified = vault
            .stat(&self.path)
            .await?
            .map(|file| file.modified)
            .unwrap_or(self.modified);
        *self = Sidecar::from_text(std::mem::take(&mut self.path), modified, &text);
        Ok(())
    }

    /// Write one front-matter field.
    ///
    /// The current file is re-read first so concurrent user edits survive.
    /// Unchanged values are not written. Failures are logged and reported
    /// as `false`; they never propagate.
    pub async fn set_field(
        &mut self,
        vault: &dyn Vault,
        name: &str,
        value: Value,
        declared: Option<FieldType>,
    ) -> bool {
        match self.try_set_field(vault, name, value, declared).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to set '{}' in {}: {}", name, self.path, e);
                false
            }
        }
    }

    async fn try_set_field(
        &mut self,
        vault: &dyn Vault,
        name: &str,
        value: Value,
        declared: Option<FieldType>,
    ) -> Result<()> {
        let value = match declared {
            Some(field_type) => field_type.coerce(name, value)?,
            None => value,
        };

        let text = vault.read_text(&self.path).await?;
        let mut document =
            FrontMatterDocument::parse(&text).map_err(|e| GalleriaError::FrontMatter {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        let key = Value::String(name.to_string());
        if document.fields.get(&key) == Some(&value) {
            debug!("'{}' unchanged in {}, skipping write", name, self.path);
        } else {
            document.fields.insert(key, value);
            vault.write_text(&self.path, &document.render()?).await?;
            self.modified = Utc::now();
        }

        self.tags = document.tags();
        self.document = document;
        Ok(())
    }

    /// Apply the hide-sidecar setting to this sidecar's entry in `pane`.
    ///
    /// Returns `false` when the pane has not rendered an entry for it yet.
    pub fn hide(&self, pane: &dyn ExplorerPane, hide_sidecar: bool) -> bool {
        let applied = pane.set_hidden(&self.path, hide_sidecar);
        if !applied {
            debug!("No explorer entry for {} yet", self.path);
        }
        applied
    }
}
