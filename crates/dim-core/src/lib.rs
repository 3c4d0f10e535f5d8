//! # Dim Core
//!
//! Document model and query construction for the dim registry index.
//!
//! This crate provides the engine-independent half of the index:
//!
//! - [`ImageDescriptor`] / [`ImageConfig`] - an image as read from a registry
//! - [`IndexedImage`] - the document stored for every `name:tag` pair
//! - [`schema`] - the fixed per-field indexing policy
//! - [`QueryBuilder`] / [`ImageQuery`] - `name[:tag]` plus advanced query
//!   strings compiled into a structured boolean query
//!
//! ## Example
//!
//! ```rust
//! use dim_core::{build_query, ContainerConfig, ImageConfig, ImageDescriptor, ImageQuery, IndexedImage};
//!
//! let config = ImageConfig {
//!     config: ContainerConfig::default()
//!         .with_label("os=ubuntu")
//!         .with_env("PATH=/bin"),
//!     ..ImageConfig::default()
//! };
//! let image = IndexedImage::parse("a/b", &ImageDescriptor::new("sha256:abc", "latest", config));
//! assert_eq!(image.full_name, "a/b:latest");
//!
//! assert_eq!(build_query("*", ""), ImageQuery::MatchAll);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod image;
pub mod model;
pub mod query;
pub mod schema;

#[cfg(test)]
mod proptest_tests;

pub use image::{ContainerConfig, ImageConfig, ImageDescriptor};
pub use model::{full_name, parse_env, parse_labels, repository_path, IndexedImage, LabelValue, DEFAULT_TAG};
pub use query::{build_query, ImageQuery, QueryBuilder, MATCH_ALL};
pub use schema::{Analyzer, FieldPolicy, FieldRef};
