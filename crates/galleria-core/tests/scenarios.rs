//! End-to-end behavior of the index, pipeline and queries over an
//! in-memory vault.

use chrono::{TimeZone, Utc};
use galleria_core::{
    AppContext, DominantColor, EventBus, GalleriaError, ImageAnalyzer, ImageSize, MediaEvent,
    MediaIndex, MemoryVault, MutationPipeline, OrderBy, Query, QueryDetails, Result, Settings,
    Vault, VaultEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Analyzer reporting a fixed 30x20 red image and counting decodes.
#[derive(Default)]
struct StubAnalyzer {
    decodes: AtomicUsize,
}

impl StubAnalyzer {
    fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl ImageAnalyzer for StubAnalyzer {
    fn dimensions(&self, bytes: &[u8]) -> Result<ImageSize> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if bytes.is_empty() {
            return Err(GalleriaError::ImageDecode {
                message: "empty".into(),
                source: None,
            });
        }
        Ok(ImageSize {
            width: 30,
            height: 20,
        })
    }

    fn dominant_colors(&self, _bytes: &[u8]) -> Result<Vec<DominantColor>> {
        Ok(vec![DominantColor {
            hue: 0.0,
            saturation: 1.0,
            lightness: 0.5,
            area: 1.0,
        }])
    }
}

struct Harness {
    vault: Arc<MemoryVault>,
    analyzer: Arc<StubAnalyzer>,
    index: Arc<MediaIndex>,
    pipeline: MutationPipeline,
    notifications: broadcast::Receiver<VaultEvent>,
    events: broadcast::Receiver<MediaEvent>,
}

impl Harness {
    /// Vault with `x/a.png`, `x/y/b.png` and `z/c.jpg`, tagged through
    /// pre-existing sidecars, and a built index.
    async fn scenario() -> Self {
        let vault = Arc::new(MemoryVault::new());
        for (path, tags) in [
            ("x/a.png", "[red]"),
            ("x/y/b.png", "[red, big]"),
            ("z/c.jpg", "[]"),
        ] {
            vault.put(path, vec![1u8, 2, 3]).await;
            vault
                .create(
                    &format!("{path}.sidecar.md"),
                    &format!("---\ntags: {tags}\nauthor: sam\n---\nNotes.\n"),
                )
                .await
                .unwrap();
        }
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 9, 0, 0).unwrap();
        vault.set_times("x/a.png", day(3), day(3)).await.unwrap();
        vault.set_times("x/y/b.png", day(1), day(5)).await.unwrap();
        vault.set_times("z/c.jpg", day(2), day(4)).await.unwrap();

        let analyzer = Arc::new(StubAnalyzer::default());
        let ctx = AppContext::new(vault.clone(), Settings::default(), analyzer.clone());
        let index = Arc::new(MediaIndex::new(ctx));
        let pipeline = MutationPipeline::new(index.clone(), EventBus::new(64));

        let mut harness = Self {
            notifications: vault.subscribe(),
            events: pipeline.bus().subscribe(),
            vault,
            analyzer,
            index,
            pipeline,
        };
        harness.index.await_ready().await.unwrap();
        harness.settle().await;
        harness.drain_events();
        harness
    }

    /// Handle every queued vault notification.
    async fn settle(&mut self) {
        self.pipeline.process_pending(&mut self.notifications).await;
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    async fn query(&self, details: QueryDetails) -> Vec<String> {
        Query::new(self.index.clone(), details)
            .unwrap()
            .get_items()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.path)
            .collect()
    }
}

fn names(events: &[MediaEvent]) -> Vec<&'static str> {
    events.iter().map(MediaEvent::name).collect()
}

#[tokio::test]
async fn test_build_counts() {
    let harness = Harness::scenario().await;
    let counts = harness.index.counts().await;

    assert_eq!(harness.index.len().await, 3);
    assert_eq!(counts.tags.get("red"), 2);
    assert_eq!(counts.tags.get("big"), 1);
    assert_eq!(counts.paths.get("x"), 2);
    assert_eq!(counts.paths.get("x/y"), 1);
    assert_eq!(counts.paths.get("z"), 1);
    assert_eq!(counts.extensions.get("png"), 2);
    assert_eq!(counts.extensions.get("jpg"), 1);
}

#[tokio::test]
async fn test_build_keeps_user_content() {
    let harness = Harness::scenario().await;
    let text = harness.vault.read_text("x/a.png.sidecar.md").await.unwrap();

    assert!(text.contains("author: sam"));
    assert!(text.contains("MC-size"));
    assert!(text.contains("MC-last-updated"));
    assert!(text.trim_end().ends_with("Notes."));
}

#[tokio::test]
async fn test_tag_query_and_ordering() {
    let harness = Harness::scenario().await;
    let red = |order_by, order_increasing| QueryDetails {
        tags: vec!["red".into()],
        order_by,
        order_increasing,
        ..QueryDetails::default()
    };

    assert_eq!(
        harness.query(red(OrderBy::Name, true)).await,
        vec!["x/a.png", "x/y/b.png"]
    );
    assert_eq!(
        harness.query(red(OrderBy::Name, false)).await,
        vec!["x/y/b.png", "x/a.png"]
    );
    assert_eq!(
        harness.query(red(OrderBy::CreationDate, true)).await,
        vec!["x/y/b.png", "x/a.png"]
    );

    let mut shuffled = harness.query(red(OrderBy::Random, true)).await;
    shuffled.sort();
    assert_eq!(shuffled, vec!["x/a.png", "x/y/b.png"]);
}

#[tokio::test]
async fn test_reversing_direction_reverses_results() {
    let harness = Harness::scenario().await;
    let modified = |order_increasing| QueryDetails {
        order_by: OrderBy::ModifiedDate,
        order_increasing,
        ..QueryDetails::default()
    };

    let mut forward = harness.query(modified(true)).await;
    assert_eq!(forward, vec!["x/a.png", "z/c.jpg", "x/y/b.png"]);
    forward.reverse();
    assert_eq!(harness.query(modified(false)).await, forward);
}

#[tokio::test]
async fn test_deleted_sidecar_is_recreated() {
    let mut harness = Harness::scenario().await;
    let before = harness.index.get("x/a.png").await.unwrap();

    harness.vault.delete("x/a.png.sidecar.md").await.unwrap();
    harness.settle().await;

    assert!(harness.vault.exists("x/a.png.sidecar.md").await);
    let after = harness.index.get("x/a.png").await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.read().await.sidecar.has_field("MC-size"));
    assert!(names(&harness.drain_events()).contains(&"sidecar-edited"));
}

#[tokio::test]
async fn test_rename_moves_record_and_counts() {
    let mut harness = Harness::scenario().await;
    let before = harness.index.counts().await;

    harness.vault.rename("x/y/b.png", "z/b.png").await.unwrap();
    harness.settle().await;

    let events = harness.drain_events();
    assert_eq!(names(&events), vec!["file-moved"]);
    match &events[0] {
        MediaEvent::FileMoved { record, old_path } => {
            assert_eq!(record.path, "z/b.png");
            assert_eq!(old_path, "x/y/b.png");
        }
        other => panic!("unexpected event {:?}", other.name()),
    }

    let after = harness.index.counts().await;
    assert_eq!(after.paths.get("x"), before.paths.get("x") - 1);
    assert!(!after.paths.contains_key("x/y"));
    assert_eq!(after.paths.get("z"), before.paths.get("z") + 1);
    assert_eq!(after.tags, before.tags);
    assert_eq!(after.extensions, before.extensions);

    assert!(harness.vault.exists("z/b.png.sidecar.md").await);
    assert!(!harness.vault.exists("x/y/b.png.sidecar.md").await);
    let record = harness.index.get("z/b.png").await.unwrap();
    assert_eq!(record.read().await.tags(), ["red", "big"]);
}

#[tokio::test]
async fn test_media_edit_recomputes_only_when_stale() {
    let mut harness = Harness::scenario().await;
    let decodes = harness.analyzer.decodes();
    assert_eq!(decodes, 3);

    // A fresh record only re-reads its sidecar
    let shared = harness.index.get("x/a.png").await.unwrap();
    {
        let mut record = shared.write().await;
        let vault = harness.vault.clone();
        assert!(
            record
                .sidecar
                .set_field(vault.as_ref(), "rating", 5i64.into(), None)
                .await
        );
    }
    harness.settle().await;
    assert_eq!(names(&harness.drain_events()), vec!["sidecar-edited"]);
    assert_eq!(harness.analyzer.decodes(), decodes);

    // New contents make it stale
    tokio::time::sleep(Duration::from_millis(5)).await;
    harness.vault.put("x/a.png", vec![9u8, 9]).await;
    harness.settle().await;
    assert_eq!(harness.analyzer.decodes(), decodes + 1);
    assert!(names(&harness.drain_events()).contains(&"file-edited"));

    let record = shared.read().await;
    assert!(!record.is_stale());
    assert_eq!(record.size, 2);
}

#[tokio::test]
async fn test_delete_and_recreate() {
    let mut harness = Harness::scenario().await;

    harness.vault.delete("z/c.jpg").await.unwrap();
    harness.settle().await;
    assert_eq!(names(&harness.drain_events()), vec!["file-deleted"]);
    assert!(!harness.index.contains("z/c.jpg").await);
    assert!(!harness.vault.exists("z/c.jpg.sidecar.md").await);
    assert!(!harness.index.counts().await.extensions.contains_key("jpg"));

    harness.vault.put("z/c.jpg", vec![4u8]).await;
    harness.settle().await;
    assert!(names(&harness.drain_events()).contains(&"file-created"));
    assert!(harness.vault.exists("z/c.jpg.sidecar.md").await);
    assert_eq!(harness.index.counts().await.extensions.get("jpg"), 1);
}

#[tokio::test]
async fn test_unrelated_sidecar_suffix_is_not_a_sidecar() {
    let mut harness = Harness::scenario().await;
    harness
        .vault
        .create("ghost.png.sidecar.md", "---\ntags: [red]\n---\n")
        .await
        .unwrap();
    harness.settle().await;

    assert!(harness.index.is_sidecar_path("x/a.png.sidecar.md").await);
    assert!(!harness.index.is_sidecar_path("ghost.png.sidecar.md").await);
    assert!(!harness.index.is_sidecar_path("x/a.png").await);

    harness.vault.delete("ghost.png.sidecar.md").await.unwrap();
    harness.settle().await;
    assert!(!harness.vault.exists("ghost.png.sidecar.md").await);
    assert!(harness.drain_events().is_empty());
}

#[tokio::test]
async fn test_failed_decode_does_not_abort_build() {
    let vault = Arc::new(MemoryVault::new());
    vault.put("ok.png", vec![1u8]).await;
    vault.put("empty.png", Vec::<u8>::new()).await;
    let ctx = AppContext::new(
        vault.clone(),
        Settings::default(),
        Arc::new(StubAnalyzer::default()),
    );
    let index = MediaIndex::new(ctx);
    let progress = index.subscribe_progress();

    index.await_ready().await.unwrap();

    assert_eq!(index.len().await, 2);
    assert!(progress.borrow().is_complete());
    let empty = index.get("empty.png").await.unwrap();
    assert!(empty.read().await.cached_size().is_none());
    assert_eq!(index.counts().await.extensions.get("png"), 2);
}
