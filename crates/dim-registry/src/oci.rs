//! Registry API wire types.
//!
//! Types for the Docker Registry HTTP API v2 / OCI Distribution endpoints the
//! crawler reads: the catalog, tag lists and image manifests.

use serde::{Deserialize, Deserializer, Serialize};

/// Manifest media types accepted when resolving an image.
#[derive(Debug, Clone, Copy)]
pub struct MediaType;

impl MediaType {
    /// Docker image manifest, schema 2.
    pub const DOCKER_MANIFEST: &'static str =
        "application/vnd.docker.distribution.manifest.v2+json";

    /// Docker multi-platform manifest list.
    pub const DOCKER_MANIFEST_LIST: &'static str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// OCI image manifest.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// `Accept` header value for manifest requests.
    #[must_use]
    pub fn accept_manifests() -> String {
        format!("{}, {}", Self::DOCKER_MANIFEST, Self::OCI_MANIFEST)
    }

    /// Whether the media type designates a multi-platform index.
    #[must_use]
    pub fn is_index(media_type: &str) -> bool {
        media_type == Self::DOCKER_MANIFEST_LIST || media_type == Self::OCI_INDEX
    }
}

/// Content descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    #[serde(default)]
    pub media_type: String,

    /// Digest of the targeted content.
    pub digest: String,

    /// Size in bytes of the content.
    #[serde(default)]
    pub size: u64,
}

impl Descriptor {
    /// Returns the digest algorithm (e.g., "sha256").
    #[must_use]
    pub fn digest_algorithm(&self) -> &str {
        self.digest.split(':').next().unwrap_or("sha256")
    }
}

/// Image manifest (Docker schema 2 or OCI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (2 for the supported formats).
    pub schema_version: u32,

    /// Media type of this manifest.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Image configuration blob. Absent for manifest lists.
    #[serde(default)]
    pub config: Option<Descriptor>,
}

/// Response from the `/v2/_catalog` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Repository names on this page.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub repositories: Vec<String>,
}

/// Response from the `/v2/<name>/tags/list` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagList {
    /// Repository name.
    pub name: String,

    /// Tags. Registries report `null` for repositories without tags.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
