//! Document index abstraction.
//!
//! The index service talks to its storage through [`DocumentIndex`]. Stored
//! field values cross this boundary as [`FieldValue`], which settles once
//! whether a field holds one value or several.

use std::collections::BTreeMap;

use dim_core::{ImageQuery, IndexedImage};
use serde::Serialize;

use crate::error::Result;

/// Default page size of a [`SearchRequest`].
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Full-text storage of image documents keyed by `FullName`.
pub trait DocumentIndex: Send + Sync {
    /// Stores `image` under `id`, replacing any document with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn index(&self, id: &str, image: &IndexedImage) -> Result<()>;

    /// Like [`index`](Self::index), but the document stays invisible to
    /// searches until the next [`flush`](Self::flush).
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn stage(&self, id: &str, image: &IndexedImage) -> Result<()>;

    /// Commits staged documents and makes them searchable.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn flush(&self) -> Result<()>;

    /// Removes the document stored under `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion cannot be written.
    fn delete(&self, id: &str) -> Result<()>;

    /// Runs a search.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid or the index cannot be read.
    fn search(&self, request: &SearchRequest) -> Result<SearchResult>;

    /// Flushes pending writes and releases the writer. Later writes fail.
    ///
    /// # Errors
    ///
    /// Returns an error if pending writes cannot be committed.
    fn close(&self) -> Result<()>;
}

/// A paginated search with the stored fields to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Query to run.
    pub query: ImageQuery,
    /// Names of the stored fields returned with each hit.
    pub fields: Vec<String>,
    /// Maximum number of hits.
    pub size: usize,
    /// Number of hits to skip.
    pub from: usize,
}

impl SearchRequest {
    /// Creates a request for the first page of `query`.
    #[must_use]
    pub const fn new(query: ImageQuery) -> Self {
        Self {
            query,
            fields: Vec::new(),
            size: DEFAULT_PAGE_SIZE,
            from: 0,
        }
    }

    /// Sets the returned fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the number of hits to skip.
    #[must_use]
    pub const fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }
}

/// A page of hits and the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    /// Number of documents matching the query, regardless of paging.
    pub total: u64,
    /// Hits of the requested page, best first.
    pub hits: Vec<DocumentMatch>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMatch {
    /// Document identifier (`FullName`).
    pub id: String,
    /// Relevance score.
    pub score: f32,
    /// Requested stored fields present on the document.
    pub fields: BTreeMap<String, FieldValue>,
}

impl DocumentMatch {
    /// Returns a stored field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the first value of a stored field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|value| value.values().next())
    }
}

/// Value of a stored field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Single value.
    Scalar(String),
    /// Several values, in stored order.
    Collection(Vec<String>),
}

impl FieldValue {
    /// Wraps stored values: none yields `None`, one yields a scalar.
    ///
    /// ```
    /// use dim_index::FieldValue;
    ///
    /// assert_eq!(FieldValue::from_values(Vec::new()), None);
    /// assert_eq!(
    ///     FieldValue::from_values(vec!["os".to_string()]),
    ///     Some(FieldValue::Scalar("os".to_string()))
    /// );
    /// ```
    #[must_use]
    pub fn from_values(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Self::Scalar),
            _ => Some(Self::Collection(values)),
        }
    }

    /// Iterates over the values, one for a scalar.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::Collection(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_from_values() {
        assert_eq!(FieldValue::from_values(vec![]), None);
        assert_eq!(
            FieldValue::from_values(vec!["a".to_string(), "b".to_string()]),
            Some(FieldValue::Collection(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn test_field_value_iterates_both_shapes() {
        let scalar = FieldValue::Scalar("os".to_string());
        assert_eq!(scalar.values().collect::<Vec<_>>(), vec!["os"]);

        let collection = FieldValue::Collection(vec!["os".to_string(), "version".to_string()]);
        assert_eq!(collection.values().collect::<Vec<_>>(), vec!["os", "version"]);
    }

    #[test]
    fn test_request_builder() {
        let request = SearchRequest::new(ImageQuery::MatchAll)
            .with_fields(["Name", "Tag"])
            .with_size(15)
            .with_from(30);
        assert_eq!(request.fields, vec!["Name", "Tag"]);
        assert_eq!(request.size, 15);
        assert_eq!(request.from, 30);
    }

    #[test]
    fn test_document_match_text() {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), FieldValue::Scalar("a/b".to_string()));
        let hit = DocumentMatch {
            id: "a/b:latest".to_string(),
            score: 1.0,
            fields,
        };
        assert_eq!(hit.text("Name"), Some("a/b"));
        assert_eq!(hit.text("Tag"), None);
    }
}
