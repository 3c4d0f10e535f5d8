//! Registry-side image descriptors.
//!
//! These types mirror the image configuration blob a registry serves for a
//! manifest. Deserialization is lenient: `null` or missing collections become
//! empty, and `Labels` is accepted either as a JSON object or as a list of
//! `key[=value]` strings.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// An image as yielded by a registry walk: its configuration digest, the tag
/// it was reached through, and its parsed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Content digest of the image configuration.
    pub id: String,

    /// Tag the image was resolved from. `None` or empty means `latest`.
    pub tag: Option<String>,

    /// Parsed image configuration.
    pub config: ImageConfig,
}

impl ImageDescriptor {
    /// Creates a descriptor for the given digest and tag.
    #[must_use]
    pub fn new(id: impl Into<String>, tag: impl Into<String>, config: ImageConfig) -> Self {
        Self {
            id: id.into(),
            tag: Some(tag.into()),
            config,
        }
    }
}

/// Image configuration blob (`application/vnd.docker.container.image.v1+json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Creation timestamp, kept verbatim. Parsed by the document model.
    #[serde(default)]
    pub created: Option<String>,

    /// Image author.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,

    /// Commit comment.
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,

    /// Runtime configuration.
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ContainerConfig,
}

/// Runtime section of an image configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Label entries in `key[=value]` form.
    #[serde(rename = "Labels", default, deserialize_with = "label_entries")]
    pub labels: Vec<String>,

    /// Environment entries in `NAME=value` form.
    #[serde(rename = "Env", default, deserialize_with = "null_as_default")]
    pub env: Vec<String>,

    /// Declared volume mount paths.
    #[serde(rename = "Volumes", default, deserialize_with = "object_keys")]
    pub volumes: Vec<String>,

    /// Declared ports, e.g. `80/tcp`.
    #[serde(rename = "ExposedPorts", default, deserialize_with = "object_keys")]
    pub exposed_ports: Vec<String>,
}

impl ContainerConfig {
    /// Adds a label entry.
    #[must_use]
    pub fn with_label(mut self, entry: impl Into<String>) -> Self {
        self.labels.push(entry.into());
        self
    }

    /// Adds an environment entry.
    #[must_use]
    pub fn with_env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    /// Adds a volume path.
    #[must_use]
    pub fn with_volume(mut self, path: impl Into<String>) -> Self {
        self.volumes.push(path.into());
        self
    }

    /// Adds an exposed port spec.
    #[must_use]
    pub fn with_exposed_port(mut self, port: impl Into<String>) -> Self {
        self.exposed_ports.push(port.into());
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn label_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawLabels {
        Map(BTreeMap<String, String>),
        List(Vec<String>),
    }

    Ok(match Option::<RawLabels>::deserialize(deserializer)? {
        Some(RawLabels::Map(map)) => map
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect(),
        Some(RawLabels::List(list)) => list,
        None => Vec::new(),
    })
}

fn object_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawKeys {
        Map(BTreeMap<String, IgnoredAny>),
        List(Vec<String>),
    }

    Ok(match Option::<RawKeys>::deserialize(deserializer)? {
        Some(RawKeys::Map(map)) => map.into_keys().collect(),
        Some(RawKeys::List(list)) => list,
        None => Vec::new(),
    })
}
