//! CLI commands and argument parsing.

pub mod add;
pub mod delete;
pub mod index;
pub mod registry;
pub mod search;

use clap::{Parser, Subcommand};

/// Dim - search the images of a private Docker registry
#[derive(Parser)]
#[command(name = "dim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Crawl a registry into a fresh index
    Index(index::IndexArgs),

    /// Search the latest index
    Search(search::SearchArgs),

    /// Fetch one image from the registry into the latest index
    Add(add::AddArgs),

    /// Remove an image from the latest index by ID
    Delete(delete::DeleteArgs),

    /// Print version information
    Version,
}
