//! Docker Registry HTTP API v2 client.
//!
//! [`HttpRegistry`] pages through `/v2/_catalog`, and each [`HttpRepository`]
//! resolves its tags through the manifest and image configuration endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use dim_core::{repository_path, ImageConfig, ImageDescriptor};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Response, StatusCode};
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::{RegistryAuth, RegistryConfig};
use crate::error::RegistryError;
use crate::oci::{Catalog, Descriptor, Manifest, MediaType, TagList};
use crate::registry::{Registry, Repository};

/// Registry reachable over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: RegistryConfig,
    http: reqwest::Client,
    headers: HeaderMap,
}

impl HttpRegistry {
    /// Creates a registry client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the credentials cannot be
    /// encoded as headers, or the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dim_registry::{HttpRegistry, RegistryConfig};
    ///
    /// let registry = HttpRegistry::new(RegistryConfig::new("https://registry.example.com"))?;
    /// # Ok::<(), dim_registry::RegistryError>(())
    /// ```
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        Url::parse(&config.url).map_err(|_| RegistryError::InvalidUrl {
            url: config.url.clone(),
        })?;
        let http = build_http_client(&config)?;
        let headers = auth_headers(&config.auth)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                http,
                headers,
            }),
        })
    }
}

impl Registry for HttpRegistry {
    fn walk_repositories(&self) -> BoxStream<'static, Arc<dyn Repository>> {
        let inner = Arc::clone(&self.inner);
        let first = match inner.catalog_url() {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build catalog URL");
                None
            }
        };

        stream::unfold((Arc::clone(&inner), first), |(inner, next)| async move {
            let url = next?;
            let page = inner.catalog_page(url).await;
            match page {
                Ok((names, next)) => Some((names, (inner, next))),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to list registry catalog");
                    None
                }
            }
        })
        .flat_map(stream::iter)
        .map(move |name| {
            tracing::debug!(repository = %name, "Found repository");
            Arc::new(HttpRepository {
                name,
                inner: Arc::clone(&inner),
            }) as Arc<dyn Repository>
        })
        .boxed()
    }

    fn repository(&self, name: &str) -> Result<Arc<dyn Repository>, RegistryError> {
        let name = validate_name(name)?;
        Ok(Arc::new(HttpRepository {
            name: name.to_string(),
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// Repository of an [`HttpRegistry`].
#[derive(Debug, Clone)]
pub struct HttpRepository {
    name: String,
    inner: Arc<ClientInner>,
}

impl HttpRepository {
    /// Lists every tag of the repository, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if a tag page cannot be fetched or parsed.
    pub async fn list_tags(&self) -> Result<Vec<String>, RegistryError> {
        let first = format!("{}/v2/{}/tags/list", self.inner.config.url, self.name);
        let mut url = Url::parse(&first).map_err(|_| RegistryError::InvalidUrl { url: first })?;
        let mut tags = Vec::new();

        loop {
            let response = self.inner.get(url.as_str(), None).await?;
            if response.status() == StatusCode::NOT_FOUND {
                break;
            }
            let response = ensure_success(response, &self.name, "tags/list").await?;
            let next = next_page(&response, &url);
            let page: TagList = response.json().await?;
            tags.extend(page.tags);

            match next {
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(tags)
    }

    async fn fetch_manifest(&self, reference: &str) -> Result<Manifest, RegistryError> {
        let url = format!(
            "{}/v2/{}/manifests/{reference}",
            self.inner.config.url, self.name
        );
        let response = self
            .inner
            .get(&url, Some(&MediaType::accept_manifests()))
            .await?;
        let response = ensure_success(response, &self.name, reference).await?;
        let manifest: Manifest = response.json().await?;

        let invalid = |message: &str| RegistryError::InvalidManifest {
            repository: self.name.clone(),
            reference: reference.to_string(),
            message: message.to_string(),
        };
        if manifest
            .media_type
            .as_deref()
            .is_some_and(MediaType::is_index)
        {
            return Err(invalid("manifest lists are not supported"));
        }
        if manifest.schema_version != 2 {
            return Err(invalid("only schema version 2 manifests are supported"));
        }

        Ok(manifest)
    }

    async fn fetch_blob(&self, digest: &str) -> Result<Vec<u8>, RegistryError> {
        let url = format!("{}/v2/{}/blobs/{digest}", self.inner.config.url, self.name);
        let response = self.inner.get(&url, None).await?;
        let response = ensure_success(response, &self.name, digest).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn resolve_tag(&self, tag: String) -> Option<ImageDescriptor> {
        match self.image_from_manifest(&tag, &tag).await {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!(repository = %self.name, tag = %tag, error = %e, "Skipping image");
                None
            }
        }
    }
}

#[async_trait]
impl Repository for HttpRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn walk_images(&self) -> BoxStream<'static, ImageDescriptor> {
        let repository = self.clone();

        stream::once(async move {
            let tags = match repository.list_tags().await {
                Ok(tags) => tags,
                Err(e) => {
                    tracing::warn!(repository = %repository.name, error = %e, "Failed to list tags");
                    Vec::new()
                }
            };
            stream::iter(tags).then(move |tag| {
                let repository = repository.clone();
                async move { repository.resolve_tag(tag).await }
            })
        })
        .flatten()
        .filter_map(futures::future::ready)
        .boxed()
    }

    async fn image_from_manifest(
        &self,
        reference: &str,
        tag: &str,
    ) -> Result<ImageDescriptor, RegistryError> {
        let manifest = self.fetch_manifest(reference).await?;
        let config = manifest
            .config
            .ok_or_else(|| RegistryError::InvalidManifest {
                repository: self.name.clone(),
                reference: reference.to_string(),
                message: "manifest has no configuration blob".to_string(),
            })?;

        let blob = self.fetch_blob(&config.digest).await?;
        verify_digest(&self.name, &config, &blob)?;
        let image: ImageConfig = serde_json::from_slice(&blob)?;

        tracing::debug!(repository = %self.name, tag, digest = %config.digest, "Resolved image");
        Ok(ImageDescriptor::new(config.digest, tag, image))
    }
}

impl ClientInner {
    fn catalog_url(&self) -> Result<Url, RegistryError> {
        let url = format!("{}/v2/_catalog?n={}", self.config.url, self.config.page_size);
        Url::parse(&url).map_err(|_| RegistryError::InvalidUrl { url })
    }

    async fn catalog_page(&self, url: Url) -> Result<(Vec<String>, Option<Url>), RegistryError> {
        let response = self.get(url.as_str(), None).await?;
        let response = ensure_success(response, "_catalog", url.as_str()).await?;
        let next = next_page(&response, &url);
        let catalog: Catalog = response.json().await?;
        tracing::debug!(count = catalog.repositories.len(), "Fetched catalog page");
        Ok((catalog.repositories, next))
    }

    async fn get(&self, url: &str, accept: Option<&str>) -> Result<Response, RegistryError> {
        let mut request = self.http.get(url).headers(self.headers.clone());
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        Ok(request.send().await?)
    }
}

/// Maps a non-success response to an error.
async fn ensure_success(
    response: Response,
    repository: &str,
    reference: &str,
) -> Result<Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(RegistryError::AuthenticationFailed {
                message: format!("{status} for {repository}@{reference}"),
            })
        }
        StatusCode::NOT_FOUND => Err(RegistryError::NotFound {
            repository: repository.to_string(),
            reference: reference.to_string(),
        }),
        _ => Err(RegistryError::HttpError {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        }),
    }
}

/// Resolves the `rel="next"` link of a paginated response against the
/// requested URL.
fn next_page(response: &Response, current: &Url) -> Option<Url> {
    response
        .headers()
        .get(LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(next_link)
        .and_then(|link| current.join(link).ok())
}

/// Extracts the target of the `rel="next"` entry of a `Link` header.
fn next_link(header: &str) -> Option<&str> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            matches!(
                param.trim().replace(' ', "").as_str(),
                "rel=\"next\"" | "rel=next"
            )
        });
        if is_next {
            target.strip_prefix('<')?.strip_suffix('>')
        } else {
            None
        }
    })
}

/// Checks a repository name and strips any registry host from it.
fn validate_name(name: &str) -> Result<&str, RegistryError> {
    let path = repository_path(name);
    let valid = !path.is_empty()
        && path.split('/').all(|component| {
            !component.is_empty()
                && component.chars().all(|c| {
                    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
                })
        });

    if valid {
        Ok(path)
    } else {
        Err(RegistryError::InvalidReference {
            reference: name.to_string(),
        })
    }
}

/// Verifies a blob against its descriptor. Only `sha256` digests are checked.
fn verify_digest(repository: &str, descriptor: &Descriptor, blob: &[u8]) -> Result<(), RegistryError> {
    if descriptor.digest_algorithm() != "sha256" {
        tracing::debug!(digest = %descriptor.digest, "Skipping verification of non-sha256 digest");
        return Ok(());
    }

    let actual = compute_digest(blob);
    if actual != descriptor.digest {
        return Err(RegistryError::ChecksumMismatch {
            repository: repository.to_string(),
            expected: descriptor.digest.clone(),
            actual,
        });
    }
    Ok(())
}

/// Computes the SHA-256 digest of data.
fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Builds the HTTP client with proper configuration.
fn build_http_client(config: &RegistryConfig) -> Result<reqwest::Client, RegistryError> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent);

    if let Some(ref tls) = config.tls {
        if tls.insecure_skip_verify {
            tracing::warn!(url = %config.url, "TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref ca_cert) = tls.ca_cert {
            let cert_pem = std::fs::read(ca_cert).map_err(|e| RegistryError::IoError {
                path: ca_cert.clone(),
                source: e,
            })?;
            let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                RegistryError::ConnectionFailed {
                    url: config.url.clone(),
                    source: e,
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }
    }

    builder.build().map_err(|e| RegistryError::ConnectionFailed {
        url: config.url.clone(),
        source: e,
    })
}

/// Creates authentication headers based on configuration.
fn auth_headers(auth: &RegistryAuth) -> Result<HeaderMap, RegistryError> {
    let mut headers = HeaderMap::new();

    match auth {
        RegistryAuth::None => {}
        RegistryAuth::Basic { username, password } => {
            let credentials = base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                format!("{username}:{password}"),
            );
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Basic {credentials}")).map_err(|_| {
                    RegistryError::AuthenticationFailed {
                        message: "Invalid credentials".to_string(),
                    }
                })?,
            );
        }
        RegistryAuth::Bearer { token } => {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    RegistryError::AuthenticationFailed {
                        message: "Invalid token".to_string(),
                    }
                })?,
            );
        }
    }

    Ok(headers)
}
