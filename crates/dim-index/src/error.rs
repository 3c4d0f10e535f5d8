//! Error types for the index crate.

use std::path::PathBuf;

use dim_registry::RegistryError;
use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building or querying the index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Repository or manifest could not be retrieved from the registry.
    #[error("failed to fetch '{repository}' from registry: {source}")]
    RegistryFetch {
        /// Repository name.
        repository: String,
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },

    /// Search could not be executed.
    #[error("query failed: {message}")]
    Query {
        /// Failure reason.
        message: String,
    },

    /// Document index engine failure.
    #[error("index engine error: {message}")]
    Engine {
        /// Failure reason.
        message: String,
    },

    /// Detail expansion of a search hit failed.
    #[error("failed to fetch details of image '{full_name}': {source}")]
    DetailProjection {
        /// Document being expanded.
        full_name: String,
        /// Underlying error.
        #[source]
        source: Box<IndexError>,
    },

    /// Document matched by a search was gone when its details were fetched.
    #[error("image '{full_name}' is no longer indexed")]
    DocumentVanished {
        /// Document identifier.
        full_name: String,
    },

    /// Index was shut down.
    #[error("index is closed")]
    Closed,

    /// Filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl IndexError {
    /// Creates a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Creates an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }
}

impl From<tantivy::TantivyError> for IndexError {
    fn from(err: tantivy::TantivyError) -> Self {
        Self::engine(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for IndexError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        Self::query(err.to_string())
    }
}

/// Outcome of a delete-by-ID request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No document has the ID. Nothing was deleted.
    NotFound,

    /// The only document with the ID was deleted.
    Deleted {
        /// Identifier of the deleted document.
        full_name: String,
    },

    /// Several documents share the ID. Nothing was deleted.
    Ambiguous {
        /// Number of matching documents.
        matches: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexError::query("unbalanced parenthesis");
        assert_eq!(err.to_string(), "query failed: unbalanced parenthesis");

        let err = IndexError::DetailProjection {
            full_name: "a/b:latest".to_string(),
            source: Box::new(IndexError::DocumentVanished {
                full_name: "a/b:latest".to_string(),
            }),
        };
        assert!(err.to_string().contains("a/b:latest"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_registry_fetch_display() {
        let err = IndexError::RegistryFetch {
            repository: "a/b".to_string(),
            source: RegistryError::NotFound {
                repository: "a/b".to_string(),
                reference: "latest".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch 'a/b' from registry: No such image: a/b@latest"
        );
    }
}
