//! Dim CLI - index and search the images of a container registry.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index(args) => commands::index::run(&args).await,
        Commands::Search(args) => commands::search::run(&args),
        Commands::Add(args) => commands::add::run(&args).await,
        Commands::Delete(args) => commands::delete::run(&args),
        Commands::Version => {
            println!("dim {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
