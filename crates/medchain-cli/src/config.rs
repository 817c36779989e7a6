//! `medchain.toml` loading and merging with command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use medchain::{ContentType, InputPolicy, RegistryConfig, DEFAULT_MAX_BYTES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;

/// Configuration problems. All map to the config exit code.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing config from {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("key file {path}: {reason}")]
    Key { path: PathBuf, reason: String },
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Largest accepted document in bytes.
    pub max_bytes: u64,
    /// Accepted document types. Empty accepts anything.
    pub allowed: Vec<ContentType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub call_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("medchain.db"),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            allowed: ContentType::ALL.to_vec(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let defaults = RegistryConfig::default();
        Self {
            call_timeout_ms: defaults.call_timeout.as_millis() as u64,
            max_attempts: defaults.max_attempts,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
        }
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply command-line overrides.
    pub fn merge_args(&mut self, args: &Args) {
        if let Some(db) = &args.db {
            self.storage.path = db.clone();
        }
        if let Some(timeout_ms) = args.timeout_ms {
            self.client.call_timeout_ms = timeout_ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.max_bytes == 0 {
            return Err(ConfigError::Invalid("policy.max_bytes must be positive".into()));
        }
        if self.client.max_attempts == 0 {
            return Err(ConfigError::Invalid("client.max_attempts must be at least 1".into()));
        }
        if self.client.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid("client.call_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn input_policy(&self) -> InputPolicy {
        InputPolicy {
            max_bytes: self.policy.max_bytes,
            allowed: self.policy.allowed.clone(),
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default()
            .with_policy(self.input_policy())
            .with_call_timeout(Duration::from_millis(self.client.call_timeout_ms))
            .with_max_attempts(self.client.max_attempts)
            .with_retry_backoff(Duration::from_millis(self.client.retry_backoff_ms))
    }
}
