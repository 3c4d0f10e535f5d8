//! Registry abstractions consumed by the index.
//!
//! Walks are lazy: repositories and images are produced as the registry is
//! paged, never collected up front.

use std::sync::Arc;

use async_trait::async_trait;
use dim_core::ImageDescriptor;
use futures::stream::BoxStream;

use crate::error::RegistryError;

/// A container image registry.
pub trait Registry: Send + Sync {
    /// Lazily yields every repository of the registry.
    ///
    /// A page that cannot be fetched ends the walk.
    fn walk_repositories(&self) -> BoxStream<'static, Arc<dyn Repository>>;

    /// Returns a handle on the named repository.
    ///
    /// A leading registry host is stripped from `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid repository name.
    fn repository(&self, name: &str) -> Result<Arc<dyn Repository>, RegistryError>;
}

/// One repository of a [`Registry`].
#[async_trait]
pub trait Repository: Send + Sync {
    /// Repository name, without registry host.
    fn name(&self) -> &str;

    /// Lazily yields every tagged image of the repository.
    ///
    /// Tags whose image cannot be resolved are skipped.
    fn walk_images(&self) -> BoxStream<'static, ImageDescriptor>;

    /// Resolves the image behind a manifest reference (digest or tag),
    /// reporting it under `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest or the configuration blob cannot be
    /// fetched, parsed or verified.
    async fn image_from_manifest(
        &self,
        reference: &str,
        tag: &str,
    ) -> Result<ImageDescriptor, RegistryError>;
}
