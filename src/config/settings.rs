//! Application settings and configuration
//!
//! This module provides configuration management for the accessor,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::Path;

/// Environment identifier that switches every call to the local bypass
pub const LOCAL_ENVIRONMENT: &str = "local";

/// Default bucket holding configuration payloads
pub const DEFAULT_CONFIG_BUCKET: &str = "configs";

/// Default name of the variable carrying the environment identifier
pub const DEFAULT_ENVIRONMENT_VAR: &str = "NODE_ENV";

/// How secret names are derived on the write path
///
/// Reads always address `<environment>_<name>`. `Legacy` writes to the bare
/// `<name>`, which is what existing stored secrets were created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SecretNaming {
    Legacy,
    #[value(alias = "prefixed")]
    Scoped,
}

impl fmt::Display for SecretNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretNaming::Legacy => write!(f, "legacy"),
            SecretNaming::Scoped => write!(f, "scoped"),
        }
    }
}

impl Default for SecretNaming {
    fn default() -> Self {
        SecretNaming::Legacy
    }
}

impl std::str::FromStr for SecretNaming {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(SecretNaming::Legacy),
            "scoped" | "prefixed" => Ok(SecretNaming::Scoped),
            _ => anyhow::bail!("Invalid secret naming: {}. Expected: legacy or scoped", s),
        }
    }
}

/// Main accessor settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Name of the variable holding the deployment environment identifier
    pub environment_var: String,
    pub log_level: String,

    // Store settings
    pub config_bucket: String,
    pub secret_naming: SecretNaming,

    // AWS settings
    pub aws_region: String,
    pub s3_endpoint_url: Option<String>,
    pub secrets_manager_endpoint_url: Option<String>,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings from a dotenv-style file only, ignoring the process environment
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut values = HashMap::new();

        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("Failed to open env file {}", path.display()))?;
        for item in iter {
            let (key, value) =
                item.with_context(|| format!("Invalid line in env file {}", path.display()))?;
            values.insert(key, value);
        }

        Self::from_lookup(|key| values.get(key).cloned())
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let settings = Self {
            environment_var: or_default("ENVIRONMENT_VAR", DEFAULT_ENVIRONMENT_VAR),
            log_level: or_default("LOG_LEVEL", "info"),

            config_bucket: or_default("CONFIG_BUCKET", DEFAULT_CONFIG_BUCKET),
            secret_naming: or_default("SECRET_NAMING", "legacy")
                .parse()
                .context("Invalid SECRET_NAMING value")?,

            aws_region: or_default("AWS_REGION", "us-east-1"),
            s3_endpoint_url: lookup("S3_ENDPOINT_URL"),
            secrets_manager_endpoint_url: lookup("SECRETS_MANAGER_ENDPOINT_URL"),
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    fn validate(&self) -> Result<()> {
        if self.config_bucket.trim().is_empty() {
            anyhow::bail!("CONFIG_BUCKET cannot be empty");
        }

        if self.environment_var.trim().is_empty() {
            anyhow::bail!("ENVIRONMENT_VAR cannot be empty");
        }

        if self.secret_naming == SecretNaming::Scoped {
            tracing::debug!("Secrets will be written under environment-scoped names");
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment_var: DEFAULT_ENVIRONMENT_VAR.to_string(),
            log_level: "info".to_string(),
            config_bucket: DEFAULT_CONFIG_BUCKET.to_string(),
            secret_naming: SecretNaming::Legacy,
            aws_region: "us-east-1".to_string(),
            s3_endpoint_url: None,
            secrets_manager_endpoint_url: None,
        }
    }
}
