//! catalogctl — inspect and drive a catalog state store.
//!
//! ```text
//! catalogctl --data-dir /var/lib/catalog apply entries.jsonl
//! catalogctl --data-dir /var/lib/catalog coordinates --node web-1
//! catalogctl --data-dir /var/lib/catalog coordinates --wait-index 42
//! catalogctl --config catalog.toml snapshot save catalog.snap
//! ```

use std::path::PathBuf;

use catalog_core::CatalogConfig;
use catalog_state::StateStore;
use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(
    name = "catalogctl",
    about = "Catalog state store admin tool",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to catalog.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory; overrides [store].data_dir from the config.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply log entries (one JSON object per line) in order.
    Apply {
        /// File of JSON log entries.
        path: PathBuf,
    },
    /// Show stored network coordinates.
    Coordinates {
        /// Only this node.
        #[arg(short, long)]
        node: Option<String>,
        /// Only this segment.
        #[arg(short, long)]
        segment: Option<String>,
        /// Block until the coordinates index passes this value, or the
        /// configured watch timeout elapses.
        #[arg(long, default_value_t = 0)]
        wait_index: u64,
    },
    /// List registered nodes.
    Nodes,
    /// Save or restore a whole-store snapshot.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Write a snapshot of the store to a file.
    Save { path: PathBuf },
    /// Replace the store's contents with a snapshot file.
    Restore { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CatalogConfig::from_file(path)?,
        None => CatalogConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.store.data_dir = Some(dir);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.filter))?,
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(dir) = &config.store.data_dir {
        std::fs::create_dir_all(dir)?;
    }
    let store = StateStore::from_config(&config.store)?;
    debug!(path = ?config.store.db_path(), "store ready");

    match cli.command {
        Commands::Apply { path } => commands::apply::apply(store, &path),
        Commands::Coordinates {
            node,
            segment,
            wait_index,
        } => {
            let timeout = config.watch.timeout()?;
            commands::query::coordinates(
                &store,
                node.as_deref(),
                segment.as_deref(),
                wait_index,
                timeout,
            )
            .await
        }
        Commands::Nodes => commands::query::nodes(&store),
        Commands::Snapshot { action } => match action {
            SnapshotAction::Save { path } => commands::snapshot::save(store, &path),
            SnapshotAction::Restore { path } => commands::snapshot::restore(store, &path),
        },
    }
}
