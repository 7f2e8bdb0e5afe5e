//! Galleria CLI - index, search and watch a media vault from the terminal.
//!
//! Results go to stdout as JSON; logs go to stderr.

mod commands;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use galleria_core::config::AppConfig;
use galleria_core::{OrderBy, Settings, Shape};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "galleria")]
#[command(about = "Media index with sidecar metadata")]
struct Cli {
    /// Vault directory (defaults to the current directory)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Settings file (defaults to <config dir>/galleria/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the index and print the record count and counters
    Scan,
    /// Build the index and print matching records as JSON lines
    Search(SearchArgs),
    /// Follow vault changes and print events until Ctrl-C
    Watch,
    /// Print the resolved settings as JSON
    Settings {
        /// Also write them to the settings file, normalized
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Case-insensitive substring of the file name
    #[arg(long)]
    name: Option<String>,

    #[arg(long = "folder")]
    folders: Vec<String>,

    #[arg(long = "exclude-folder")]
    exclude_folders: Vec<String>,

    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long = "exclude-tag")]
    exclude_tags: Vec<String>,

    #[arg(long = "ext")]
    extensions: Vec<String>,

    #[arg(long = "exclude-ext")]
    exclude_extensions: Vec<String>,

    /// square, horizontal or vertical
    #[arg(long)]
    shape: Option<Shape>,

    #[arg(long)]
    min_width: Option<u32>,

    #[arg(long)]
    max_width: Option<u32>,

    #[arg(long)]
    min_height: Option<u32>,

    #[arg(long)]
    max_height: Option<u32>,

    #[arg(long)]
    created_after: Option<NaiveDate>,

    #[arg(long)]
    created_before: Option<NaiveDate>,

    #[arg(long)]
    modified_after: Option<NaiveDate>,

    #[arg(long)]
    modified_before: Option<NaiveDate>,

    /// Approximate dominant color as #rrggbb
    #[arg(long)]
    color: Option<String>,

    /// Front-matter field that must be present (repeatable)
    #[arg(long = "has-field")]
    has_fields: Vec<String>,

    /// random, created, modified or name
    #[arg(long, default_value = "name")]
    order_by: OrderBy,

    #[arg(long)]
    descending: bool,

    /// Print at most this many records
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --debug
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let vault_root = match cli.vault {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let settings_path = resolve_settings_path(cli.settings)?;
    debug!("Settings file: {}", settings_path.display());
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

    match cli.command {
        Command::Scan => commands::scan(&vault_root, settings).await,
        Command::Search(args) => commands::search(&vault_root, settings, args).await,
        Command::Watch => commands::watch(&vault_root, settings).await,
        Command::Settings { write } => commands::settings(&settings_path, &settings, write),
    }
}

fn resolve_settings_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let config_dir = dirs::config_dir().context("No configuration directory on this platform")?;
    Ok(config_dir
        .join(AppConfig::SETTINGS_DIR_NAME)
        .join(AppConfig::SETTINGS_FILENAME))
}
