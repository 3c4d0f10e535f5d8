//! Errors of the registry client.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while walking a registry or fetching one image from it.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not be reached, or the HTTP client could not be set up.
    #[error("Registry {url} unreachable: {source}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The registry refused the credentials (401 or 403).
    #[error("Access denied by registry: {message}")]
    AuthenticationFailed {
        /// Status and resource that were refused.
        message: String,
    },

    /// The repository, manifest or blob does not exist (404).
    #[error("No such image: {repository}@{reference}")]
    NotFound {
        /// Repository name.
        repository: String,
        /// Tag or digest.
        reference: String,
    },

    /// The manifest is a list or an old schema version.
    #[error("Unsupported manifest {repository}@{reference}: {message}")]
    InvalidManifest {
        /// Repository name.
        repository: String,
        /// Tag or digest.
        reference: String,
        /// Why the manifest was rejected.
        message: String,
    },

    /// The configuration blob does not hash to the digest the manifest names.
    #[error("Config blob of {repository} is {actual}, manifest says {expected}")]
    ChecksumMismatch {
        /// Repository name.
        repository: String,
        /// Digest named by the manifest.
        expected: String,
        /// Digest of the downloaded blob.
        actual: String,
    },

    /// A local file (CA certificate) could not be read.
    #[error("Cannot read {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Any other unsuccessful HTTP exchange. `status` is 0 when no response arrived.
    #[error("Registry answered {status}: {message}")]
    HttpError {
        /// Response status.
        status: u16,
        /// Response body or transport error.
        message: String,
    },

    /// A catalog, tag list, manifest or config blob is not the expected JSON.
    #[error("Malformed registry response: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The registry URL, or a URL derived from it, does not parse.
    #[error("Bad registry URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// A repository name with characters the registry API does not allow.
    #[error("Bad repository name: {reference}")]
    InvalidReference {
        /// Name as given.
        reference: String,
    },
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            let url = err.url().map_or_else(String::new, ToString::to_string);
            return Self::ConnectionFailed { url, source: err };
        }
        Self::HttpError {
            status: err.status().map_or(0, |status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}
