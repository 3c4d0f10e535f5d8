//! # Dim Index
//!
//! Registry image index: crawl pipeline, incremental updates and two-phase
//! search over a tantivy document index.
//!
//! ## Overview
//!
//! - [`IndexService::build`] walks a [`Registry`](dim_registry::Registry)
//!   and indexes every image, returning a single-shot [`BuildHandle`]
//! - [`IndexService::index_from_event`] / [`IndexService::delete_image`]
//!   keep the index current between builds
//! - [`IndexService::search_images`] runs a `name[:tag]` / advanced query
//!   and optionally expands label and environment values
//! - [`ImageIndex`] offers the same searches, upserts and deletes on an
//!   existing build without a registry
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dim_index::{IndexConfig, IndexService};
//! use dim_registry::{HttpRegistry, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = HttpRegistry::new(RegistryConfig::new("https://registry.example.com"))?;
//!     let config = IndexConfig::builder().root_dir("dim.index").build();
//!     let service = IndexService::create(config, Arc::new(registry))?;
//!
//!     let stats = service.build().wait().await;
//!     println!("indexed {} images", stats.images);
//!
//!     let page = service.search_images("nginx", "", &["Labels".to_string()], 0, 15)?;
//!     println!("{} matches", page.total);
//!
//!     service.shutdown()?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crawl;
pub mod engine;
pub mod error;
pub mod images;
pub mod search;
pub mod service;
pub mod tantivy_engine;

pub use config::{IndexConfig, IndexConfigBuilder};
pub use crawl::{BuildHandle, BuildStats};
pub use engine::{DocumentIndex, DocumentMatch, FieldValue, SearchRequest, SearchResult};
pub use error::{DeleteOutcome, IndexError, Result};
pub use images::ImageIndex;
pub use search::{ImageSummary, SUMMARY_FIELDS};
pub use service::IndexService;
pub use tantivy_engine::TantivyIndex;
