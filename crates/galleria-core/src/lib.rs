//! Galleria Core - Headless media index with sidecar metadata.
//!
//! Every tracked media file in a vault gets a companion Markdown document
//! (`<file>.sidecar.md`) that stores user tags and fields together with
//! cached analysis results. The index keeps one record per file plus
//! counters over folders, tags and extensions, stays in sync with vault
//! change notifications, and answers multi-predicate queries.
//!
//! # Example
//!
//! ```rust,ignore
//! use galleria_core::{FsVault, GalleriaApi, QueryDetails};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> galleria_core::Result<()> {
//!     let vault = Arc::new(FsVault::new("/path/to/vault")?);
//!     let api = GalleriaApi::builder(vault).build();
//!     api.start().await?;
//!
//!     let details = QueryDetails {
//!         tags: vec!["holiday".into()],
//!         ..QueryDetails::default()
//!     };
//!     for record in api.search(details).await? {
//!         println!("{}", record.path);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod media;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod settings;
pub mod sidecar;
pub mod vault;

mod api;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::{GalleriaApi, GalleriaApiBuilder};
pub use context::AppContext;
pub use error::{GalleriaError, Result};
pub use index::{BuildProgress, CountMap, IndexCounts, IndexState, MediaIndex};
pub use media::{DominantColor, ImageAnalyzer, ImageSize, MediaKind, PixelAnalyzer, Shape};
pub use pipeline::{EventBus, MediaEvent, MutationPipeline};
pub use query::{DateRange, DimensionBounds, OrderBy, Query, QueryDetails};
pub use record::{MediaRecord, RecordSummary, SharedRecord};
pub use settings::Settings;
pub use sidecar::{FieldType, Sidecar, SidecarStore};
pub use vault::{ExplorerPane, FsVault, MemoryVault, Vault, VaultEvent, VaultFile, VaultWatcher};
