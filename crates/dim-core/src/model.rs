//! Indexable image documents.
//!
//! [`IndexedImage::parse`] turns an [`ImageDescriptor`] into the document
//! stored in the index. Parsing is total: malformed metadata degrades to
//! empty values instead of failing, so every image stays findable by name
//! and tag.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::image::ImageDescriptor;

/// Tag assumed when the registry reports none.
pub const DEFAULT_TAG: &str = "latest";

/// Value of an image label.
///
/// A label declared without `=` is a presence-only flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    /// `key=value` label.
    Text(String),
    /// `key` label without a value.
    Flag(bool),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

/// One indexed `name:tag` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexedImage {
    /// Configuration digest. Several tags may share it.
    #[serde(rename = "ID")]
    pub id: String,

    /// Repository path without registry host.
    pub name: String,

    /// Tag.
    pub tag: String,

    /// `name:tag`, the document identifier.
    pub full_name: String,

    /// History comment.
    pub comment: String,

    /// Image author.
    pub author: String,

    /// Creation time, when the registry reported a parseable one.
    pub created: Option<DateTime<Utc>>,

    /// Labels keyed by name.
    pub labels: BTreeMap<String, LabelValue>,

    /// Volume mount paths, sorted.
    pub volumes: Vec<String>,

    /// Exposed ports, sorted ascending.
    pub exposed_ports: Vec<u16>,

    /// Environment variables keyed by name.
    pub env: BTreeMap<String, String>,
}

impl IndexedImage {
    /// Builds the indexable document for an image of `repository`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dim_core::{ContainerConfig, ImageConfig, ImageDescriptor, IndexedImage};
    ///
    /// let config = ImageConfig {
    ///     config: ContainerConfig::default().with_label("os=ubuntu"),
    ///     ..ImageConfig::default()
    /// };
    /// let image = IndexedImage::parse(
    ///     "registry.example.com/library/nginx",
    ///     &ImageDescriptor::new("sha256:abc", "1.25", config),
    /// );
    ///
    /// assert_eq!(image.name, "library/nginx");
    /// assert_eq!(image.full_name, "library/nginx:1.25");
    /// ```
    #[must_use]
    pub fn parse(repository: &str, descriptor: &ImageDescriptor) -> Self {
        let name = repository_path(repository).to_string();
        let tag = descriptor
            .tag
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TAG)
            .to_string();
        let config = &descriptor.config;

        Self {
            id: descriptor.id.clone(),
            full_name: full_name(&name, &tag),
            name,
            tag,
            comment: config.comment.clone(),
            author: config.author.clone(),
            created: config.created.as_deref().and_then(parse_created),
            labels: parse_labels(&config.config.labels),
            volumes: parse_volumes(&config.config.volumes),
            exposed_ports: parse_ports(&config.config.exposed_ports),
            env: parse_env(&config.config.env),
        }
    }
}

/// Joins a repository name and a tag into a document identifier.
#[must_use]
pub fn full_name(name: &str, tag: &str) -> String {
    format!("{name}:{tag}")
}

/// Strips a leading registry host from a repository reference.
///
/// The first path component is a host when it contains a `.` or a `:`, or is
/// `localhost`.
///
/// ```
/// use dim_core::repository_path;
///
/// assert_eq!(repository_path("registry.example.com:5000/a/b"), "a/b");
/// assert_eq!(repository_path("library/nginx"), "library/nginx");
/// ```
#[must_use]
pub fn repository_path(repository: &str) -> &str {
    match repository.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            rest
        }
        _ => repository,
    }
}

/// Parses `key[=value]` label entries. Entries without `=` become flags.
#[must_use]
pub fn parse_labels(entries: &[String]) -> BTreeMap<String, LabelValue> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), LabelValue::Text(value.to_string())),
            None => (entry.clone(), LabelValue::Flag(true)),
        })
        .collect()
}

/// Parses `NAME=value` environment entries. Entries without `=` are dropped.
#[must_use]
pub fn parse_env(entries: &[String]) -> BTreeMap<String, String> {
    entries
        .iter()
        .filter_map(|entry| entry.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn parse_volumes(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parse_ports(specs: &[String]) -> Vec<u16> {
    specs
        .iter()
        .filter_map(|spec| {
            let port = spec.split_once('/').map_or(spec.as_str(), |(port, _)| port);
            port.trim().parse::<u16>().ok()
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parse_created(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(created) => Some(created.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(created = raw, error = %e, "Ignoring unparseable creation date");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ContainerConfig, ImageConfig};

    fn descriptor(tag: Option<&str>, config: ContainerConfig) -> ImageDescriptor {
        ImageDescriptor {
            id: "sha256:0123".to_string(),
            tag: tag.map(ToString::to_string),
            config: ImageConfig {
                created: Some("2016-09-23T23:31:41Z".to_string()),
                author: "ops".to_string(),
                comment: "initial import".to_string(),
                config,
            },
        }
    }

    #[test]
    fn test_parse_basic_fields() {
        let image = IndexedImage::parse("a/b", &descriptor(Some("1.0"), ContainerConfig::default()));
        assert_eq!(image.id, "sha256:0123");
        assert_eq!(image.name, "a/b");
        assert_eq!(image.tag, "1.0");
        assert_eq!(image.full_name, "a/b:1.0");
        assert_eq!(image.author, "ops");
        assert_eq!(image.comment, "initial import");
        assert!(image.created.is_some());
    }

    #[test]
    fn test_missing_tag_defaults_to_latest() {
        let image = IndexedImage::parse("a/b", &descriptor(None, ContainerConfig::default()));
        assert_eq!(image.tag, "latest");
        assert_eq!(image.full_name, "a/b:latest");

        let image = IndexedImage::parse("a/b", &descriptor(Some(""), ContainerConfig::default()));
        assert_eq!(image.tag, "latest");
    }

    #[test]
    fn test_label_parsing() {
        let labels = parse_labels(&["os=ubuntu".to_string(), "debug".to_string()]);
        assert_eq!(labels.get("os"), Some(&LabelValue::Text("ubuntu".to_string())));
        assert_eq!(labels.get("debug"), Some(&LabelValue::Flag(true)));
    }

    #[test]
    fn test_label_value_keeps_extra_separators() {
        let labels = parse_labels(&["opts=a=b".to_string()]);
        assert_eq!(labels.get("opts"), Some(&LabelValue::Text("a=b".to_string())));
    }

    #[test]
    fn test_env_parsing_drops_malformed_entries() {
        let env = parse_env(&["PATH=/bin".to_string(), "BROKEN".to_string()]);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("PATH"), Some(&"/bin".to_string()));
        assert!(!env.contains_key("BROKEN"));
    }

    #[test]
    fn test_ports_and_volumes() {
        let config = ContainerConfig::default()
            .with_exposed_port("443/tcp")
            .with_exposed_port("80/tcp")
            .with_exposed_port("80/udp")
            .with_exposed_port("bogus")
            .with_volume("/var/log")
            .with_volume("/data");
        let image = IndexedImage::parse("a/b", &descriptor(Some("1.0"), config));
        assert_eq!(image.exposed_ports, vec![80, 443]);
        assert_eq!(image.volumes, vec!["/data", "/var/log"]);
    }

    #[test]
    fn test_malformed_created_is_dropped() {
        let mut desc = descriptor(Some("1.0"), ContainerConfig::default());
        desc.config.created = Some("yesterday".to_string());
        let image = IndexedImage::parse("a/b", &desc);
        assert!(image.created.is_none());
    }

    #[test]
    fn test_repository_path() {
        assert_eq!(repository_path("localhost/a/b"), "a/b");
        assert_eq!(repository_path("localhost:5000/a"), "a");
        assert_eq!(repository_path("docker.example.com/a/b"), "a/b");
        assert_eq!(repository_path("a/b"), "a/b");
        assert_eq!(repository_path("nginx"), "nginx");
    }

    #[test]
    fn test_serialized_field_names() {
        let image = IndexedImage::parse("a/b", &descriptor(Some("1.0"), ContainerConfig::default()));
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["ID"], "sha256:0123");
        assert_eq!(json["FullName"], "a/b:1.0");
        assert!(json.get("ExposedPorts").is_some());
    }

    #[test]
    fn test_label_value_display() {
        assert_eq!(LabelValue::Text("ubuntu".to_string()).to_string(), "ubuntu");
        assert_eq!(LabelValue::Flag(true).to_string(), "true");
    }
}
