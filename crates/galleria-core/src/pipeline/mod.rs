//! Mutation pipeline: keeps the index and sidecars in step with the vault.
//!
//! Host notifications are handled strictly one at a time. Every handler
//! fails soft: an error is logged and the next notification proceeds.

mod events;

pub use events::{EventBus, MediaEvent};

use crate::context::AppContext;
use crate::error::Result;
use crate::index::MediaIndex;
use crate::record::{MediaRecord, SharedRecord};
use crate::sidecar::{media_path_for, SidecarStore};
use crate::vault::{path, VaultEvent, VaultFile};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, warn};

/// Reacts to vault notifications and publishes [`MediaEvent`]s.
#[derive(Clone)]
pub struct MutationPipeline {
    ctx: AppContext,
    index: Arc<MediaIndex>,
    store: SidecarStore,
    bus: EventBus,
}

impl MutationPipeline {
    pub fn new(index: Arc<MediaIndex>, bus: EventBus) -> Self {
        Self {
            ctx: index.context().clone(),
            store: index.store().clone(),
            index,
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Handle notifications until the channel closes.
    pub async fn run(&self, mut events: broadcast::Receiver<VaultEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Mutation pipeline lagged, {} notifications dropped", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Vault notification channel closed");
                    break;
                }
            }
        }
    }

    /// Handle every notification already queued on `events`, including the
    /// ones produced while handling. Returns how many were handled.
    pub async fn process_pending(&self, events: &mut broadcast::Receiver<VaultEvent>) -> usize {
        let mut handled = 0;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    self.handle(event).await;
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Mutation pipeline lagged, {} notifications dropped", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return handled,
            }
        }
    }

    /// Handle one notification. Failures are logged, never returned.
    pub async fn handle(&self, event: VaultEvent) {
        let result = match &event {
            VaultEvent::Created(file) => self.on_created(file).await,
            VaultEvent::Deleted { path } => self.on_deleted(path).await,
            VaultEvent::Renamed { file, old_path } => self.on_moved(file, old_path).await,
            VaultEvent::Modified(file) => self.on_edited(file).await,
        };
        match result {
            Ok(()) => {}
            // Usually the file changed again before this notification was handled
            Err(e) if e.is_transient() => {
                debug!("Skipped change to {}: {}", event.path(), e);
            }
            Err(e) => warn!("Failed to handle change to {}: {}", event.path(), e),
        }
    }

    async fn on_created(&self, file: &VaultFile) -> Result<()> {
        if !self.ctx.tracks(file.extension()).await {
            return Ok(());
        }
        if self.index.contains(&file.path).await {
            debug!("{} already indexed, ignoring duplicate creation", file.path);
            return Ok(());
        }

        let record = MediaRecord::create(&self.ctx, &self.store, file).await?;
        if self.index.contains(&file.path).await {
            debug!("{} was indexed while it was being built", file.path);
            return Ok(());
        }
        let shared = self.index.add_file(record).await;
        debug!("Indexed new file {}", file.path);
        self.bus
            .publish(MediaEvent::FileCreated(snapshot(&shared).await));
        Ok(())
    }

    async fn on_deleted(&self, deleted: &str) -> Result<()> {
        if let Some(owner) = media_path_for(deleted) {
            if self.index.contains(owner).await {
                if self.ctx.vault().exists(owner).await {
                    info!("Sidecar of {} was deleted, recreating it", owner);
                    return self.restore_sidecar(owner).await;
                }
                // Owner is going away as well; its own deletion cleans up
                return Ok(());
            }
        }

        if !self.ctx.tracks(path::extension(deleted)).await {
            return Ok(());
        }
        let Some(shared) = self.index.take_file(deleted).await else {
            return Ok(());
        };
        self.bus
            .publish(MediaEvent::FileDeleted(snapshot(&shared).await));
        self.store.delete(deleted).await;
        Ok(())
    }

    async fn on_moved(&self, file: &VaultFile, old_path: &str) -> Result<()> {
        let new_path = file.path.as_str();

        if let Some(owner) = media_path_for(old_path) {
            if self.index.contains(owner).await {
                if self.ctx.vault().exists(owner).await {
                    info!("Sidecar of {} was moved to {}, recreating it", owner, new_path);
                    return self.restore_sidecar(owner).await;
                }
                return Ok(());
            }
        }

        let tracked = self.ctx.tracks(file.extension()).await;

        if self.index.contains(old_path).await {
            if !tracked {
                return self.drop_untracked(old_path, new_path).await;
            }

            self.store.rename(old_path, new_path).await;
            let Some(shared) = self.index.file_moved(old_path, new_path).await else {
                return Ok(());
            };
            // A sidecar already at the destination wins over the moved one
            let sidecar = self.store.create_or_get(new_path).await?;
            shared.write().await.sidecar = sidecar;
            self.index.sidecar_updated().await;

            debug!("Moved {} -> {}", old_path, new_path);
            self.bus.publish(MediaEvent::FileMoved {
                record: snapshot(&shared).await,
                old_path: old_path.to_string(),
            });
            return Ok(());
        }

        if !tracked || self.index.contains(new_path).await {
            return Ok(());
        }

        // Not indexed under its old name (untracked extension, or moved in
        // from outside): build it, reusing a sidecar that travelled along.
        self.store.rename(old_path, new_path).await;
        let record = MediaRecord::create(&self.ctx, &self.store, file).await?;
        let shared = self.index.add_file(record).await;
        self.bus.publish(MediaEvent::FileMoved {
            record: snapshot(&shared).await,
            old_path: old_path.to_string(),
        });
        Ok(())
    }

    async fn on_edited(&self, file: &VaultFile) -> Result<()> {
        if let Some(owner) = media_path_for(&file.path) {
            if let Some(shared) = self.index.get(owner).await {
                let record = refresh(&self.ctx, &shared).await?;
                self.index.sidecar_updated().await;
                debug!("Sidecar of {} edited", owner);
                self.bus.publish(MediaEvent::SidecarEdited(record));
                return Ok(());
            }
        }

        if !self.ctx.tracks(file.extension()).await {
            return Ok(());
        }
        let Some(shared) = self.index.get(&file.path).await else {
            return Ok(());
        };
        let record = refresh(&self.ctx, &shared).await?;
        self.index.sidecar_updated().await;
        debug!("{} edited", file.path);
        self.bus.publish(MediaEvent::FileEdited(record));
        Ok(())
    }

    /// Recreate a missing sidecar for an indexed, still existing file.
    ///
    /// The record keeps its identity; only its sidecar and the values
    /// cached in it are rebuilt.
    async fn restore_sidecar(&self, owner: &str) -> Result<()> {
        let Some(shared) = self.index.get(owner).await else {
            return Ok(());
        };
        let sidecar = self.store.create_or_get(owner).await?;
        shared.write().await.sidecar = sidecar;
        let record = refresh(&self.ctx, &shared).await?;
        self.index.sidecar_updated().await;
        self.bus.publish(MediaEvent::SidecarEdited(record));
        Ok(())
    }

    /// A tracked file was renamed to an extension that is not tracked.
    async fn drop_untracked(&self, old_path: &str, new_path: &str) -> Result<()> {
        let Some(shared) = self.index.take_file(old_path).await else {
            return Ok(());
        };
        debug!("{} renamed to untracked {}, dropping it", old_path, new_path);
        self.bus
            .publish(MediaEvent::FileDeleted(snapshot(&shared).await));
        self.store.delete(old_path).await;
        Ok(())
    }
}

async fn snapshot(shared: &SharedRecord) -> MediaRecord {
    shared.read().await.clone()
}

/// Run the record's update under its write lock and return a snapshot.
async fn refresh(ctx: &AppContext, shared: &SharedRecord) -> Result<MediaRecord> {
    let mut record = shared.write().await;
    record.update(ctx).await?;
    Ok(record.clone())
}
