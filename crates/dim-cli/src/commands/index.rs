//! Index command implementation.
//!
//! Crawls every repository of a registry into a new timestamped index.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use dim_index::{IndexConfig, IndexService};

use super::registry::RegistryArgs;

/// Arguments for the index command.
#[derive(Args)]
pub struct IndexArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Root directory of the index builds
    #[arg(long, env = "DIM_INDEX_PATH", default_value = "dim.index")]
    pub index_path: PathBuf,

    /// Number of images indexed concurrently
    #[arg(long)]
    pub workers: Option<usize>,

    /// Capacity of the queue between repository walkers and indexers
    #[arg(long)]
    pub queue_size: Option<usize>,
}

/// Runs the index command.
///
/// # Errors
///
/// Returns an error if:
/// - The registry settings are invalid
/// - The index directory cannot be created
/// - The index cannot be flushed on shutdown
pub async fn run(args: &IndexArgs) -> Result<()> {
    info!(registry = %args.registry.url, index_path = %args.index_path.display(), "Indexing registry");

    let registry = args.registry.connect()?;
    let service = IndexService::create(index_config(args), Arc::new(registry))
        .context("Failed to create index")?;

    let build = service.build();
    let stats = tokio::select! {
        stats = build.wait() => Some(stats),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping index build");
            None
        }
    };

    service.shutdown().context("Failed to close index")?;

    match stats {
        Some(stats) => {
            println!("Repositories: {}", stats.repositories);
            println!("Images:       {}", stats.images);
            println!("Failed:       {}", stats.failed);
        }
        None => println!("Index build interrupted"),
    }
    Ok(())
}

fn index_config(args: &IndexArgs) -> IndexConfig {
    let mut builder = IndexConfig::builder().root_dir(&args.index_path);
    if let Some(workers) = args.workers {
        builder = builder.index_workers(workers);
    }
    if let Some(capacity) = args.queue_size {
        builder = builder.queue_capacity(capacity);
    }
    builder.build()
}
