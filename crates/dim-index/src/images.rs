//! Image index without a registry: upserts, deletes and searches.

use std::sync::Arc;

use dim_core::{schema, ImageQuery, IndexedImage, QueryBuilder};

use crate::config::IndexConfig;
use crate::engine::{DocumentIndex, SearchRequest};
use crate::error::{DeleteOutcome, IndexError, Result};
use crate::tantivy_engine::TantivyIndex;

/// Handle on a document index holding image documents.
///
/// Writes block on the engine's commit; async callers should run
/// [`index_image`](Self::index_image) and [`delete_image`](Self::delete_image)
/// on the blocking pool.
#[derive(Clone)]
pub struct ImageIndex {
    pub(crate) index: Arc<dyn DocumentIndex>,
    pub(crate) queries: QueryBuilder,
}

impl ImageIndex {
    /// Wraps a document index. `fuzziness` is the edit distance used when
    /// matching image names.
    #[must_use]
    pub fn new(index: Arc<dyn DocumentIndex>, fuzziness: u8) -> Self {
        Self {
            index,
            queries: QueryBuilder::new().with_fuzziness(fuzziness),
        }
    }

    /// Opens the newest build under `config.root_dir` for searching only.
    ///
    /// # Errors
    ///
    /// Returns an error if no build exists or it cannot be opened.
    pub fn open_latest(config: &IndexConfig) -> Result<Self> {
        let index = TantivyIndex::open_latest(&config.root_dir)?;
        Ok(Self::new(Arc::new(index), config.fuzziness))
    }

    /// Opens the newest build under `config.root_dir` for searching and
    /// writing.
    ///
    /// # Errors
    ///
    /// Returns an error if no build exists, it cannot be opened, or another
    /// process is writing to it.
    pub fn open_latest_writable(config: &IndexConfig) -> Result<Self> {
        let index = TantivyIndex::open_latest_writable(&config.root_dir, config.writer_heap_bytes)?;
        Ok(Self::new(Arc::new(index), config.fuzziness))
    }

    /// Upserts one image under its `FullName`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn index_image(&self, image: &IndexedImage) -> Result<()> {
        tracing::debug!(image_id = %image.id, full_name = %image.full_name, "Indexing image");
        self.index.index(&image.full_name, image)
    }

    /// Deletes the image whose configuration digest is `id`.
    ///
    /// Nothing is deleted when no image or several images have that ID; the
    /// outcome is logged and returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the deletion fails.
    pub fn delete_image(&self, id: &str) -> Result<DeleteOutcome> {
        let request = SearchRequest::new(ImageQuery::term(schema::ID, id))
            .with_fields([schema::FULL_NAME])
            .with_size(2);
        let result = self.index.search(&request)?;

        match (result.total, result.hits.first()) {
            (0, _) => {
                tracing::info!(image_id = %id, "Image not indexed, nothing to delete");
                Ok(DeleteOutcome::NotFound)
            }
            (1, Some(hit)) => {
                tracing::info!(image_id = %id, full_name = %hit.id, "Removing image from index");
                self.index.delete(&hit.id)?;
                Ok(DeleteOutcome::Deleted {
                    full_name: hit.id.clone(),
                })
            }
            (1, None) => Err(IndexError::DocumentVanished {
                full_name: id.to_string(),
            }),
            (matches, _) => {
                tracing::warn!(image_id = %id, matches, "Several images share this ID, not deleting");
                Ok(DeleteOutcome::Ambiguous { matches })
            }
        }
    }

    /// Flushes the index and releases its writer.
    ///
    /// # Errors
    ///
    /// Returns an error if pending writes cannot be committed.
    pub fn shutdown(self) -> Result<()> {
        self.index.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dim_core::{ContainerConfig, ImageConfig, ImageDescriptor};

    const HEAP: usize = 15_000_000;

    fn image(repository: &str, tag: &str, digest: &str) -> IndexedImage {
        let config = ImageConfig {
            config: ContainerConfig::default().with_label("os=alpine"),
            ..ImageConfig::default()
        };
        IndexedImage::parse(repository, &ImageDescriptor::new(digest, tag, config))
    }

    fn in_ram() -> ImageIndex {
        ImageIndex::new(Arc::new(TantivyIndex::create_in_ram(HEAP).unwrap()), 1)
    }

    #[test]
    fn test_index_and_delete_without_registry() {
        let images = in_ram();
        images.index_image(&image("library/nginx", "latest", "sha256:aaa")).unwrap();
        images.index_image(&image("library/redis", "latest", "sha256:bbb")).unwrap();

        let outcome = images.delete_image("sha256:aaa").unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                full_name: "library/nginx:latest".to_string()
            }
        );
        assert_eq!(images.delete_image("sha256:aaa").unwrap(), DeleteOutcome::NotFound);
        assert_eq!(images.search_images("*", "", &[], 0, 10).unwrap().total, 1);
    }

    #[test]
    fn test_delete_refuses_shared_id() {
        let images = in_ram();
        images.index_image(&image("library/nginx", "1.0", "sha256:aaa")).unwrap();
        images.index_image(&image("library/nginx", "latest", "sha256:aaa")).unwrap();

        assert_eq!(
            images.delete_image("sha256:aaa").unwrap(),
            DeleteOutcome::Ambiguous { matches: 2 }
        );
        assert_eq!(images.search_images("nginx", "", &[], 0, 10).unwrap().total, 2);
    }

    #[test]
    fn test_open_latest_is_read_only() {
        let root = tempfile::tempdir().unwrap();
        let config = IndexConfig::builder().root_dir(root.path()).build();
        assert!(ImageIndex::open_latest(&config).is_err());

        let dir = config.build_dir(chrono::Local::now());
        let images = ImageIndex::new(Arc::new(TantivyIndex::create_in_dir(&dir, HEAP).unwrap()), 1);
        images.index_image(&image("library/nginx", "latest", "sha256:aaa")).unwrap();
        images.shutdown().unwrap();

        let reader = ImageIndex::open_latest(&config).unwrap();
        assert_eq!(reader.search_images("nginx", "", &[], 0, 10).unwrap().total, 1);
        assert!(matches!(
            reader.delete_image("sha256:aaa"),
            Err(IndexError::Closed)
        ));

        let writer = ImageIndex::open_latest_writable(&config).unwrap();
        assert!(matches!(
            writer.delete_image("sha256:aaa").unwrap(),
            DeleteOutcome::Deleted { .. }
        ));
    }
}
