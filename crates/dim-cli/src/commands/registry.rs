//! Registry connection arguments shared by the commands that talk to a
//! registry.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use dim_registry::{HttpRegistry, RegistryAuth, RegistryConfig, TlsConfig};

/// Registry connection arguments.
#[derive(Args)]
pub struct RegistryArgs {
    /// Registry URL (e.g., `<https://registry.example.com>`)
    #[arg(short, long = "registry", env = "DIM_REGISTRY_URL")]
    pub url: String,

    /// Bearer token for authentication
    #[arg(long, env = "DIM_REGISTRY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username for basic authentication
    #[arg(short, long, env = "DIM_REGISTRY_USERNAME")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "DIM_REGISTRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// CA certificate used to verify the registry
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

impl RegistryArgs {
    /// Creates the registry client.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the client cannot be
    /// built.
    pub fn connect(&self) -> Result<HttpRegistry> {
        HttpRegistry::new(self.config()?).context("Failed to create registry client")
    }

    fn config(&self) -> Result<RegistryConfig> {
        let mut config = RegistryConfig::new(&self.url)
            .with_auth(self.auth()?)
            .with_timeout(Duration::from_secs(self.timeout));

        if self.insecure || self.ca_cert.is_some() {
            let mut tls = TlsConfig::new();
            if let Some(ref path) = self.ca_cert {
                tls = tls.with_ca_cert(path);
            }
            if self.insecure {
                tls = tls.insecure();
            }
            config = config.with_tls(tls);
        }
        Ok(config)
    }

    /// Determines the authentication method from the arguments.
    fn auth(&self) -> Result<RegistryAuth> {
        if let Some(ref token) = self.token {
            return Ok(RegistryAuth::bearer(token));
        }

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Ok(RegistryAuth::basic(username, password));
        }

        if self.username.is_some() || self.password.is_some() {
            anyhow::bail!("Both --username and --password are required for basic authentication");
        }

        Ok(RegistryAuth::None)
    }
}
