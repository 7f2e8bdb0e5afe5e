//! User settings and their persistence.

mod atomic;

pub use atomic::{atomic_read_json, atomic_write_json};

use crate::config::{SidecarConfig, DEFAULT_EXTENSIONS};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings consumed by the index, sidecar store and pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Tracked file extensions, in user order.
    pub extensions: Vec<String>,
    /// Hide sidecar documents in file-browser panes.
    pub hide_sidecar: bool,
    /// Initial content of newly created sidecars.
    pub sidecar_template: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            hide_sidecar: false,
            sidecar_template: String::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults when absent.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Option<Settings> = atomic_read_json(path)?;
        Ok(settings.unwrap_or_default().normalized())
    }

    /// Persist settings, keeping a backup of the previous file.
    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self, true)
    }

    /// Lowercase extensions, strip leading dots, drop `md` and duplicates.
    pub fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.extensions.len());
        for ext in self.extensions.drain(..) {
            let ext = ext.trim().trim_start_matches('.').to_lowercase();
            if ext.is_empty() || ext == SidecarConfig::DOCUMENT_EXTENSION || seen.contains(&ext) {
                continue;
            }
            seen.push(ext);
        }
        self.extensions = seen;
        self
    }

    /// Whether files with this extension are indexed (case-insensitive).
    pub fn tracks(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.extensions.iter().any(|e| *e == extension)
    }
}
