//! Connection settings of the registry client.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of repositories requested per catalog page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Where the registry is and how to talk to it.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL, without the `/v2` suffix.
    pub url: String,

    /// Credentials sent with every request.
    pub auth: RegistryAuth,

    /// Timeout of each HTTP request.
    pub timeout: Duration,

    /// Custom CA or disabled verification.
    pub tls: Option<TlsConfig>,

    /// `User-Agent` header value.
    pub user_agent: String,

    /// Repositories requested per `_catalog` page.
    pub page_size: usize,
}

impl RegistryConfig {
    /// Creates a configuration for the registry at `url`.
    ///
    /// A trailing `/` is removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dim_registry::RegistryConfig;
    ///
    /// let config = RegistryConfig::new("https://registry.example.com/");
    /// assert_eq!(config.url, "https://registry.example.com");
    /// ```
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            auth: RegistryAuth::None,
            timeout: Duration::from_secs(30),
            tls: None,
            user_agent: format!("dim-registry/{}", env!("CARGO_PKG_VERSION")),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the TLS configuration.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Sets the catalog page size. Zero is raised to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Credentials for the registry.
///
/// Credentials are forwarded as provided; the registry decides what they
/// grant.
#[derive(Debug, Clone, Default)]
pub enum RegistryAuth {
    /// Anonymous access.
    #[default]
    None,

    /// `Authorization: Basic`.
    Basic {
        /// Username.
        username: String,
        /// Password or token.
        password: String,
    },

    /// `Authorization: Bearer`, for a token obtained out of band.
    Bearer {
        /// Token value.
        token: String,
    },
}

impl RegistryAuth {
    /// Creates basic authentication.
    ///
    /// # Examples
    ///
    /// ```
    /// use dim_registry::RegistryAuth;
    ///
    /// let auth = RegistryAuth::basic("user", "pass");
    /// ```
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }
}

/// TLS settings for registries with private certificates.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// PEM file of an extra trusted root.
    pub ca_cert: Option<PathBuf>,

    /// Accept any server certificate.
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// System roots only, verification on.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ca_cert: None,
            insecure_skip_verify: false,
        }
    }

    /// Trusts the root certificate in `path` as well.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Turns certificate verification off, e.g. for a registry with a
    /// self-signed certificate.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.insecure_skip_verify = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = RegistryConfig::new("https://example.com");
        assert_eq!(config.url, "https://example.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(matches!(config.auth, RegistryAuth::None));
    }

    #[test]
    fn test_page_size_floor() {
        let config = RegistryConfig::new("https://example.com").with_page_size(0);
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn test_basic_auth() {
        let auth = RegistryAuth::basic("user", "pass");
        assert!(matches!(
            auth,
            RegistryAuth::Basic { username, password }
            if username == "user" && password == "pass"
        ));
    }

    #[test]
    fn test_bearer_auth() {
        let auth = RegistryAuth::bearer("token123");
        assert!(matches!(
            auth,
            RegistryAuth::Bearer { token } if token == "token123"
        ));
    }

    #[test]
    fn test_tls_config() {
        let tls = TlsConfig::new().with_ca_cert("/path/to/ca.crt").insecure();
        assert_eq!(tls.ca_cert, Some(PathBuf::from("/path/to/ca.crt")));
        assert!(tls.insecure_skip_verify);
    }
}
