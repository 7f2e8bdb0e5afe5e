//! Subcommand implementations.

use crate::SearchArgs;
use anyhow::Result;
use galleria_core::{
    DateRange, DimensionBounds, FsVault, GalleriaApi, MediaEvent, QueryDetails, Settings,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

fn open(root: &Path, settings: Settings) -> Result<(Arc<FsVault>, GalleriaApi)> {
    let vault = Arc::new(FsVault::new(root)?);
    info!("Vault: {}", vault.root().display());
    let api = GalleriaApi::builder(vault.clone()).settings(settings).build();
    Ok((vault, api))
}

pub async fn scan(root: &Path, settings: Settings) -> Result<()> {
    let (_vault, api) = open(root, settings)?;
    let started = Instant::now();
    api.index().await_ready().await?;

    let summary = json!({
        "records": api.index().len().await,
        "elapsedMs": started.elapsed().as_millis() as u64,
        "counts": api.counts().await,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn search(root: &Path, settings: Settings, args: SearchArgs) -> Result<()> {
    let limit = args.limit;
    let (_vault, api) = open(root, settings)?;

    let records = api.search(query_details(args)).await?;
    info!("{} records matched", records.len());
    for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
        let summary = record.summary(api.resource_path(&record.path));
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}

pub async fn watch(root: &Path, settings: Settings) -> Result<()> {
    let (vault, api) = open(root, settings)?;
    let watcher = vault.watch()?;
    let mut events = api.subscribe();
    api.start().await?;
    info!("Watching for changes, press Ctrl-C to stop");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Shutdown signal received, exiting");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => println!("{}", event_line(&api, &event)?),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Output lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    watcher.stop().await;
    api.stop().await;
    Ok(())
}

pub fn settings(path: &Path, settings: &Settings, write: bool) -> Result<()> {
    if write {
        settings.save(path)?;
        info!("Settings written to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn event_line(api: &GalleriaApi, event: &MediaEvent) -> Result<String> {
    let record = event.record();
    let mut line = json!({
        "event": event.name(),
        "record": record.summary(api.resource_path(&record.path)),
    });
    if let MediaEvent::FileMoved { old_path, .. } = event {
        line["oldPath"] = json!(old_path);
    }
    Ok(serde_json::to_string(&line)?)
}

fn query_details(args: SearchArgs) -> QueryDetails {
    QueryDetails {
        name: args.name.unwrap_or_default(),
        folders: args.folders,
        exclude_folders: args.exclude_folders,
        tags: args.tags,
        exclude_tags: args.exclude_tags,
        extensions: args.extensions,
        exclude_extensions: args.exclude_extensions,
        shape: args.shape,
        dimensions: DimensionBounds {
            min_width: args.min_width,
            max_width: args.max_width,
            min_height: args.min_height,
            max_height: args.max_height,
        },
        created: DateRange {
            start: args.created_after,
            end: args.created_before,
        },
        modified: DateRange {
            start: args.modified_after,
            end: args.modified_before,
        },
        color: args.color,
        order_by: args.order_by,
        order_increasing: !args.descending,
        has_fields: args.has_fields,
    }
}
