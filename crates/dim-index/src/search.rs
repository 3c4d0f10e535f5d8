//! Search and detail projection.
//!
//! A search first fetches summary fields only. When the caller asks for
//! more, every hit is fetched again by its identifier with the requested
//! fields plus one `Label.<key>` / `Env.<key>` field per key found in the
//! summary.

use std::collections::BTreeMap;

use dim_core::schema::{self, FieldRef};
use dim_core::ImageQuery;
use serde::Serialize;

use crate::engine::{DocumentMatch, SearchRequest, SearchResult};
use crate::error::{IndexError, Result};
use crate::images::ImageIndex;

/// Fields returned by the first search phase.
pub const SUMMARY_FIELDS: [&str; 5] = [
    schema::NAME,
    schema::TAG,
    schema::FULL_NAME,
    schema::LABELS,
    schema::ENVS,
];

/// Fields every expanded hit carries.
const IDENTITY_FIELDS: [&str; 3] = [schema::NAME, schema::TAG, schema::FULL_NAME];

impl ImageIndex {
    /// Compiles `simple` and `advanced` into a query and runs [`search`](Self::search).
    ///
    /// # Errors
    ///
    /// See [`search`](Self::search).
    pub fn search_images(
        &self,
        simple: &str,
        advanced: &str,
        fields: &[String],
        offset: usize,
        max_results: usize,
    ) -> Result<SearchResult> {
        let query = self.queries.build(simple, advanced);
        self.search(query, fields, offset, max_results)
    }

    /// Runs `query` and returns one page of hits.
    ///
    /// Without `fields`, hits carry the summary fields. With `fields`, every
    /// hit is replaced by its expansion to `fields` plus `Name`, `Tag` and
    /// `FullName`.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails, or
    /// [`IndexError::DetailProjection`] if any hit cannot be expanded. No
    /// partially expanded page is returned. Requested fields the index does
    /// not know are left out of the hits.
    pub fn search(
        &self,
        query: ImageQuery,
        fields: &[String],
        offset: usize,
        max_results: usize,
    ) -> Result<SearchResult> {
        let request = SearchRequest::new(query)
            .with_fields(SUMMARY_FIELDS)
            .with_size(max_results)
            .with_from(offset);
        tracing::debug!(query = ?request.query, offset, max_results, "Running search");
        let mut result = self.index.search(&request)?;

        if !fields.is_empty() {
            let detail_fields = with_identity_fields(fields);
            result.hits = result
                .hits
                .into_iter()
                .map(|hit| self.expand(hit, &detail_fields))
                .collect::<Result<Vec<_>>>()?;
        }

        Ok(result)
    }

    fn expand(&self, hit: DocumentMatch, fields: &[String]) -> Result<DocumentMatch> {
        tracing::debug!(full_name = %hit.id, ?fields, "Fetching image details");
        let mut requested = fields.to_vec();
        let wants = |name: &str| fields.iter().any(|f| f == name);

        if wants(schema::LABELS) {
            if let Some(keys) = hit.field(schema::LABELS) {
                requested.extend(keys.values().map(schema::label_field));
            }
        }
        if wants(schema::ENVS) {
            if let Some(keys) = hit.field(schema::ENVS) {
                requested.extend(keys.values().map(schema::env_field));
            }
        }

        let request = SearchRequest::new(ImageQuery::doc_id(hit.id.clone()))
            .with_fields(requested)
            .with_size(1);
        let mut detail = self
            .index
            .search(&request)
            .map_err(|e| detail_error(&hit.id, e))?;

        let mut expanded = detail.hits.pop().ok_or_else(|| {
            detail_error(
                &hit.id,
                IndexError::DocumentVanished {
                    full_name: hit.id.clone(),
                },
            )
        })?;
        expanded.score = hit.score;
        Ok(expanded)
    }
}

fn detail_error(full_name: &str, source: IndexError) -> IndexError {
    IndexError::DetailProjection {
        full_name: full_name.to_string(),
        source: Box::new(source),
    }
}

/// Requested fields followed by any missing identity field.
fn with_identity_fields(fields: &[String]) -> Vec<String> {
    let mut all = fields.to_vec();
    for field in IDENTITY_FIELDS {
        if !all.iter().any(|f| f == field) {
            all.push(field.to_string());
        }
    }
    all
}

/// Typed view of a search hit for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    /// Repository name.
    pub name: String,
    /// Tag.
    pub tag: String,
    /// `name:tag`.
    pub full_name: String,
    /// Label values, when the hit was expanded with `Labels`.
    pub labels: BTreeMap<String, String>,
    /// Environment values, when the hit was expanded with `Envs`.
    pub env: BTreeMap<String, String>,
    /// Volumes, when requested.
    pub volumes: Vec<String>,
    /// Exposed ports, when requested.
    pub exposed_ports: Vec<u16>,
}

impl ImageSummary {
    /// Reads the fields of a hit.
    #[must_use]
    pub fn from_match(hit: &DocumentMatch) -> Self {
        let text = |name: &str| hit.text(name).unwrap_or_default().to_string();
        let values = |name: &str| -> Vec<String> {
            hit.field(name)
                .map(|value| value.values().map(ToString::to_string).collect())
                .unwrap_or_default()
        };

        let mut labels = BTreeMap::new();
        let mut env = BTreeMap::new();
        for (name, value) in &hit.fields {
            let Some(first) = value.values().next() else {
                continue;
            };
            match FieldRef::resolve(name) {
                Some(FieldRef::Label(key)) => {
                    labels.insert(key.to_string(), first.to_string());
                }
                Some(FieldRef::Env(key)) => {
                    env.insert(key.to_string(), first.to_string());
                }
                _ => {}
            }
        }

        Self {
            name: text(schema::NAME),
            tag: text(schema::TAG),
            full_name: if hit.id.is_empty() {
                text(schema::FULL_NAME)
            } else {
                hit.id.clone()
            },
            labels,
            env,
            volumes: values(schema::VOLUMES),
            exposed_ports: values(schema::EXPOSED_PORTS)
                .iter()
                .filter_map(|port| port.parse().ok())
                .collect(),
        }
    }
}
