//! Domain events published after index mutations.

use crate::record::MediaRecord;
use tokio::sync::broadcast;

/// Published once the corresponding index change has been committed.
///
/// Payloads are snapshots of the affected record.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    FileCreated(MediaRecord),
    FileEdited(MediaRecord),
    SidecarEdited(MediaRecord),
    FileDeleted(MediaRecord),
    FileMoved { record: MediaRecord, old_path: String },
}

impl MediaEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::FileCreated(_) => "file-created",
            MediaEvent::FileEdited(_) => "file-edited",
            MediaEvent::SidecarEdited(_) => "sidecar-edited",
            MediaEvent::FileDeleted(_) => "file-deleted",
            MediaEvent::FileMoved { .. } => "file-moved",
        }
    }

    pub fn record(&self) -> &MediaRecord {
        match self {
            MediaEvent::FileCreated(record)
            | MediaEvent::FileEdited(record)
            | MediaEvent::SidecarEdited(record)
            | MediaEvent::FileDeleted(record) => record,
            MediaEvent::FileMoved { record, .. } => record,
        }
    }
}

/// Broadcast channel for [`MediaEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MediaEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; returns how many received it.
    pub fn publish(&self, event: MediaEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
