//! Add command implementation.
//!
//! Fetches one image from the registry and upserts it into the newest
//! index build, as a registry push notification would.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use dim_index::{IndexConfig, IndexService};

use super::registry::RegistryArgs;

/// Arguments for the add command.
#[derive(Args)]
pub struct AddArgs {
    /// Repository of the image, optionally prefixed by the registry host
    pub repository: String,

    /// Tag the image was pushed with
    pub tag: String,

    /// Manifest digest
    pub digest: String,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Root directory of the index builds
    #[arg(long, env = "DIM_INDEX_PATH", default_value = "dim.index")]
    pub index_path: PathBuf,
}

/// Runs the add command.
///
/// # Errors
///
/// Returns an error if the registry settings are invalid, no writable index
/// build exists, or the image cannot be fetched or indexed.
pub async fn run(args: &AddArgs) -> Result<()> {
    info!(repository = %args.repository, tag = %args.tag, digest = %args.digest, "Adding image");

    let registry = args.registry.connect()?;
    let config = IndexConfig::builder().root_dir(&args.index_path).build();
    let service = IndexService::open_latest(config, Arc::new(registry))
        .with_context(|| format!("No writable index under {}", args.index_path.display()))?;

    let indexed = service
        .index_from_event(&args.repository, &args.tag, &args.digest)
        .await
        .with_context(|| format!("Failed to index {}:{}", args.repository, args.tag));
    service.shutdown().context("Failed to close index")?;
    indexed?;

    println!("Indexed {}:{}", args.repository, args.tag);
    Ok(())
}
