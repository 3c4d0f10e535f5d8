//! Search command implementation.
//!
//! Runs a query against the newest index build and prints the matches a
//! page at a time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use dim_core::schema;
use dim_index::{ImageIndex, ImageSummary, IndexConfig, SearchResult};

/// Arguments for the search command.
#[derive(Args)]
#[command(after_help = "Examples:
  dim search nginx:latest
  dim search -a Label.os:ubuntu
  dim search -a Labels:os
  dim search -a '+Label.os:ubuntu -Label.version:xenial'")]
pub struct SearchArgs {
    /// Image name and optional tag, or an advanced query with -a
    pub query: String,

    /// Treat the query as an advanced query over every field
    #[arg(short, long)]
    pub advanced: bool,

    /// Root directory of the index builds
    #[arg(long, env = "DIM_INDEX_PATH", default_value = "dim.index")]
    pub index_path: PathBuf,

    /// Number of matches to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Number of results to fetch at a time
    #[arg(long, default_value = "15")]
    pub bulk_size: usize,

    /// Detail field to fetch for each match (repeatable)
    #[arg(long = "field")]
    pub fields: Vec<String>,
}

/// Runs the search command.
///
/// # Errors
///
/// Returns an error if no index build exists under the index path or if
/// the query fails.
pub fn run(args: &SearchArgs) -> Result<()> {
    let config = IndexConfig::builder().root_dir(&args.index_path).build();
    let images = ImageIndex::open_latest(&config)
        .with_context(|| format!("No index found under {}", args.index_path.display()))?;

    let (simple, advanced) = if args.advanced {
        ("", args.query.as_str())
    } else {
        (args.query.as_str(), "")
    };
    let fields = detail_fields(&args.fields);
    let bulk_size = args.bulk_size.max(1);
    debug!(simple, advanced, ?fields, bulk_size, "Searching images");

    let mut offset = args.offset;
    let mut page = images
        .search_images(simple, advanced, &fields, offset, bulk_size)
        .context("Failed to search images")?;

    if page.total == 0 {
        eprintln!("No result found");
        return Ok(());
    }
    eprintln!("{} results found :", page.total);
    println!("{}", format_row(&["Name", "Tag", "Labels", "Volumes", "Ports"].map(String::from)));

    while !page.hits.is_empty() {
        print_page(&page);
        offset += page.hits.len();
        if u64::try_from(offset).unwrap_or(u64::MAX) >= page.total {
            break;
        }
        page = images
            .search_images(simple, advanced, &fields, offset, bulk_size)
            .context("Failed to search images")?;
    }
    println!();
    Ok(())
}

/// Requested fields, or the ones the table shows.
fn detail_fields(requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        [schema::LABELS, schema::VOLUMES, schema::EXPOSED_PORTS]
            .map(String::from)
            .to_vec()
    } else {
        requested.to_vec()
    }
}

fn print_page(page: &SearchResult) {
    for hit in &page.hits {
        println!("{}", format_row(&table_row(&ImageSummary::from_match(hit))));
    }
}

fn table_row(image: &ImageSummary) -> [String; 5] {
    let labels = image
        .labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    let ports = image
        .exposed_ports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    [
        image.name.clone(),
        image.tag.clone(),
        labels,
        image.volumes.join(","),
        ports,
    ]
}

fn format_row(columns: &[String; 5]) -> String {
    let [name, tag, labels, volumes, ports] = columns;
    format!("{name:<30} {tag:<15} {labels:<40} {volumes:<20} {ports}")
        .trim_end()
        .to_string()
}
