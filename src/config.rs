//! Client configuration.
//!
//! Settings are resolved in this order, later sources winning:
//!
//! 1. built-in defaults
//! 2. a JSON file: `$PHANTASMA_CONFIG`, else `<config dir>/phantasma-link/config.json`
//!    when it exists
//! 3. environment: `PHANTASMA_RPC_URL`, `PHANTASMA_NEXUS`
//! 4. command line flags (applied by the binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::rpc::{HttpTransport, RpcError};
use crate::workflow::{ConfirmationPolicy, WorkflowSettings, DEFAULT_CHAIN, DEFAULT_NEXUS};

/// Node endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:7077/rpc";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PHANTASMA_CONFIG";

/// Environment variable overriding the endpoint.
pub const RPC_URL_ENV: &str = "PHANTASMA_RPC_URL";

/// Environment variable overriding the nexus name.
pub const NEXUS_ENV: &str = "PHANTASMA_NEXUS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// JSON-RPC endpoint, http or https.
    pub endpoint: String,
    /// Nexus name signed into transactions.
    pub nexus: String,
    pub request_timeout_secs: u64,
    /// How long a signed transaction stays valid.
    pub transaction_validity_secs: i64,
    pub confirmation: ConfirmationPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            nexus: DEFAULT_NEXUS.to_string(),
            request_timeout_secs: crate::rpc::DEFAULT_TIMEOUT_SECS,
            transaction_validity_secs: crate::signing::DEFAULT_VALIDITY_SECS,
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Resolve defaults, config file and environment, then validate.
    pub fn load() -> Result<Self> {
        let config = Self::resolve()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve defaults, config file and environment without validating, so
    /// command line flags can still replace a bad value.
    pub fn resolve() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ClientConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// `<platform config dir>/phantasma-link/config.json`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("phantasma-link").join("config.json"))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(RPC_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%endpoint, "endpoint overridden from environment");
            self.endpoint = endpoint.trim().to_string();
        }
        if let Some(nexus) = lookup(NEXUS_ENV).filter(|v| !v.trim().is_empty()) {
            self.nexus = nexus.trim().to_string();
        }
    }

    /// Apply command line flags; `None` keeps the resolved value.
    pub fn apply_flags(&mut self, endpoint: Option<String>, timeout_secs: Option<u64>) {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        if let Some(timeout) = timeout_secs {
            self.request_timeout_secs = timeout;
        }
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid endpoint URL {:?}", self.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "Endpoint must use http or https, got {:?}",
                url.scheme()
            );
        }
        if self.nexus.trim().is_empty() {
            bail!("Nexus name must not be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        if self.transaction_validity_secs <= 0 {
            bail!("transaction_validity_secs must be positive");
        }
        if let Err(reason) = self.confirmation.validate() {
            bail!("Invalid confirmation policy: {}", reason);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the HTTP transport for the configured endpoint.
    pub fn http_transport(&self) -> Result<HttpTransport, RpcError> {
        HttpTransport::with_timeout(self.endpoint.clone(), self.request_timeout())
    }

    /// Workflow settings derived from this configuration.
    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            nexus: self.nexus.clone(),
            chain: DEFAULT_CHAIN.to_string(),
            validity: chrono::Duration::seconds(self.transaction_validity_secs),
            confirmation: self.confirmation,
        }
    }
}
