//! Index service: builds, incremental updates and deletes.

use std::sync::Arc;

use chrono::Local;
use dim_core::{repository_path, ImageQuery, IndexedImage};
use dim_registry::{Registry, RegistryError};

use crate::config::IndexConfig;
use crate::crawl::{spawn_build, BuildHandle};
use crate::engine::{DocumentIndex, SearchResult};
use crate::error::{DeleteOutcome, IndexError, Result};
use crate::images::ImageIndex;
use crate::tantivy_engine::TantivyIndex;

/// Owned handle on an image index and the registry it mirrors.
///
/// Searches, upserts and deletes are those of [`ImageIndex`]; the service
/// adds the operations that read from the registry.
#[derive(Clone)]
pub struct IndexService {
    images: ImageIndex,
    registry: Arc<dyn Registry>,
    config: IndexConfig,
}

impl IndexService {
    /// Creates a service over an existing document index.
    #[must_use]
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        registry: Arc<dyn Registry>,
        config: IndexConfig,
    ) -> Self {
        Self {
            images: ImageIndex::new(index, config.fuzziness),
            registry,
            config,
        }
    }

    /// Creates a service over a fresh index in a new timestamped directory
    /// under `config.root_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index directory cannot be created.
    pub fn create(config: IndexConfig, registry: Arc<dyn Registry>) -> Result<Self> {
        let dir = config.build_dir(Local::now());
        let index = TantivyIndex::create_in_dir(&dir, config.writer_heap_bytes)?;
        Ok(Self::new(Arc::new(index), registry, config))
    }

    /// Creates a service writing to the newest build under
    /// `config.root_dir`.
    ///
    /// # Errors
    ///
    /// See [`ImageIndex::open_latest_writable`].
    pub fn open_latest(config: IndexConfig, registry: Arc<dyn Registry>) -> Result<Self> {
        Ok(Self {
            images: ImageIndex::open_latest_writable(&config)?,
            registry,
            config,
        })
    }

    /// Indexes every image of the registry in the background.
    ///
    /// Failures on individual images are logged and counted, never raised.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn build(&self) -> BuildHandle {
        spawn_build(
            Arc::clone(&self.registry),
            Arc::clone(&self.images.index),
            &self.config,
        )
    }

    /// See [`ImageIndex::index_image`].
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn index_image(&self, image: &IndexedImage) -> Result<()> {
        self.images.index_image(image)
    }

    /// Fetches one image from the registry and upserts it.
    ///
    /// Meant for registry push notifications. A leading registry host in
    /// `repository` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::RegistryFetch`] if the repository or manifest
    /// cannot be retrieved, or an engine error if the write fails.
    pub async fn index_from_event(&self, repository: &str, tag: &str, digest: &str) -> Result<()> {
        let name = repository_path(repository);
        let fetch_error = |source: RegistryError| {
            tracing::error!(repository = %name, tag, digest, error = %source, "Failed to fetch image");
            IndexError::RegistryFetch {
                repository: name.to_string(),
                source,
            }
        };

        let handle = self.registry.repository(name).map_err(fetch_error)?;
        let descriptor = handle
            .image_from_manifest(digest, tag)
            .await
            .map_err(fetch_error)?;
        let image = IndexedImage::parse(handle.name(), &descriptor);

        let images = self.images.clone();
        tokio::task::spawn_blocking(move || images.index_image(&image))
            .await
            .map_err(|e| IndexError::engine(format!("indexing task failed: {e}")))?
    }

    /// See [`ImageIndex::delete_image`].
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the deletion fails.
    pub fn delete_image(&self, id: &str) -> Result<DeleteOutcome> {
        self.images.delete_image(id)
    }

    /// See [`ImageIndex::search_images`].
    ///
    /// # Errors
    ///
    /// See [`ImageIndex::search`].
    pub fn search_images(
        &self,
        simple: &str,
        advanced: &str,
        fields: &[String],
        offset: usize,
        max_results: usize,
    ) -> Result<SearchResult> {
        self.images
            .search_images(simple, advanced, fields, offset, max_results)
    }

    /// See [`ImageIndex::search`].
    ///
    /// # Errors
    ///
    /// See [`ImageIndex::search`].
    pub fn search(
        &self,
        query: ImageQuery,
        fields: &[String],
        offset: usize,
        max_results: usize,
    ) -> Result<SearchResult> {
        self.images.search(query, fields, offset, max_results)
    }

    /// Flushes the index and releases its writer.
    ///
    /// # Errors
    ///
    /// Returns an error if pending writes cannot be committed.
    pub fn shutdown(self) -> Result<()> {
        tracing::info!("Shutting down index service");
        self.images.shutdown()
    }
}
