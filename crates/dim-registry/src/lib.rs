//! # Dim Registry
//!
//! Docker Registry HTTP API v2 client used to crawl a registry for the dim
//! image index.
//!
//! ## Features
//!
//! - **Lazy walks**: repositories and images are streamed while the registry
//!   is paged
//! - **Manifest resolution**: Docker schema 2 and OCI image manifests
//! - **Integrity**: configuration blobs are verified against their digest
//! - **Auth**: Basic and Bearer credentials, custom CA and insecure TLS
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dim_registry::{HttpRegistry, Registry, RegistryAuth, RegistryConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::new("https://registry.example.com")
//!         .with_auth(RegistryAuth::basic("user", "pass"));
//!     let registry = HttpRegistry::new(config)?;
//!
//!     let mut repositories = registry.walk_repositories();
//!     while let Some(repository) = repositories.next().await {
//!         println!("{}", repository.name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Registry::walk_repositories ── GET /v2/_catalog?n=N  (Link: rel="next")
//!        │
//!        ▼
//! Repository::walk_images ────── GET /v2/<name>/tags/list
//!        │                         per tag:
//!        ▼
//! Repository::image_from_manifest ─ GET /v2/<name>/manifests/<ref>
//!                                   GET /v2/<name>/blobs/<config digest>
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod oci;
mod registry;

pub use client::{HttpRegistry, HttpRepository};
pub use config::{RegistryAuth, RegistryConfig, TlsConfig, DEFAULT_PAGE_SIZE};
pub use error::RegistryError;
pub use oci::{Catalog, Descriptor, Manifest, MediaType, TagList};
pub use registry::{Registry, Repository};
