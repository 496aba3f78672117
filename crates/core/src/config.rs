use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::confirm::DEFAULT_TICKET_TTL_SECS;

const SIGNING_KEY_ENV: &str = "CUSTODIAN_SIGNING_KEY";
const TICKET_TTL_ENV: &str = "CUSTODIAN_TICKET_TTL_SECS";

// SecretString's Debug output is redacted, so deriving here leaks nothing.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Key used to sign confirmation tickets.
    pub signing_key: SecretString,
    /// Bounded lifetime of a pending confirmation.
    pub ticket_ttl_secs: i64,
    /// Default page size for recent audit entry queries.
    pub recent_entries_default: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            signing_key: String::new().into(),
            ticket_ttl_secs: DEFAULT_TICKET_TTL_SECS,
            recent_entries_default: 20,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    confirmation: RawConfirmation,
    #[serde(default)]
    audit: RawAudit,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfirmation {
    signing_key: Option<String>,
    ticket_ttl_secs: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAudit {
    recent_entries_default: Option<usize>,
}

impl GatewayConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// environment overrides, then validates.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let raw = match config_path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .map_err(|source| ConfigError::ReadFile { path: path.to_owned(), source })?;
                toml::from_str(&contents)
                    .map_err(|source| ConfigError::ParseFile { path: path.to_owned(), source })?
            }
            None => RawConfig::default(),
        };

        let mut config = Self::default();
        if let Some(signing_key) = raw.confirmation.signing_key {
            config.signing_key = signing_key.into();
        }
        if let Some(ttl) = raw.confirmation.ticket_ttl_secs {
            config.ticket_ttl_secs = ttl;
        }
        if let Some(page) = raw.audit.recent_entries_default {
            config.recent_entries_default = page;
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(signing_key) = env::var(SIGNING_KEY_ENV) {
            self.signing_key = signing_key.into();
        }
        if let Ok(raw_ttl) = env::var(TICKET_TTL_ENV) {
            let ttl = raw_ttl.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: TICKET_TTL_ENV.to_string(),
                value: raw_ttl,
            })?;
            self.ticket_ttl_secs = ttl;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.expose_secret().is_empty() {
            return Err(ConfigError::Validation(
                "confirmation.signing_key must not be empty".to_string(),
            ));
        }
        if self.ticket_ttl_secs <= 0 {
            return Err(ConfigError::Validation(
                "confirmation.ticket_ttl_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
