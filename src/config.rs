//! Service configuration for simdex.
//!
//! A single YAML document describes the whole service: the HTTP listener,
//! the store shape, the signature input, and the vp-tree toggle. The
//! server loads it from a file (with environment overrides layered on by
//! the server crate); tools can parse it from a string.
//!
//! ## Example
//!
//! ```yaml
//! version: "1.0"
//!
//! server:
//!   bind_addr: "0.0.0.0"
//!   port: 8080
//!   log_level: "info"
//!
//! store:
//!   enabled: true
//!   size: 6
//!   small: false
//!   compressed: false
//!
//! ingest:
//!   input: "signatures.txt"
//!   shard_index: 0
//!   shard_total: 1
//!
//! vptree:
//!   enabled: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{LoadOptions, Shard, StoreOptions, StoreSize, TableKind};

/// Errors when loading or validating a service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the simdex service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServiceConfig {
    /// Configuration format version.
    #[serde(default = "default_config_version")]
    pub version: String,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub ingest: IngestSection,

    #[serde(default)]
    pub vptree: VptreeSection,
}

impl ServiceConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigError::UnsupportedVersion(v.to_string())),
        }?;

        self.store.validate()?;
        self.ingest.validate()?;

        if !self.store.enabled && !self.vptree.enabled {
            return Err(ConfigError::Validation(
                "at least one of store and vptree must be enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// The load pipeline options this configuration describes. The
    /// configuration must have been validated.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            input: self.ingest.input.clone().into(),
            store: self.store.enabled.then(|| StoreOptions {
                size: if self.store.size == 3 {
                    StoreSize::Size3
                } else {
                    StoreSize::Size6
                },
                small: self.store.small,
                kind: if self.store.compressed {
                    TableKind::Compressed
                } else {
                    TableKind::Plain
                },
            }),
            vptree: self.vptree.enabled,
            shard: Shard::new(self.ingest.shard_index, self.ingest.shard_total)
                .unwrap_or_else(|_| Shard::solo()),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            server: ServerSection::default(),
            store: StoreSection::default(),
            ingest: IngestSection::default(),
            vptree: VptreeSection::default(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Log filter directive (e.g. `info` or `server=debug,tower_http=warn`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

/// Store shape settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "true_value")]
    pub enabled: bool,

    /// Permutation family selector: 3 or 6.
    #[serde(default = "default_store_size")]
    pub size: u8,

    /// Low-memory preset for size 3.
    #[serde(default)]
    pub small: bool,

    /// Use the delta-compressed table representation.
    #[serde(default)]
    pub compressed: bool,
}

impl StoreSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.size != 3 && self.size != 6 {
            return Err(ConfigError::Validation(format!(
                "store.size must be 3 or 6, got {}",
                self.size
            )));
        }
        if self.small && self.size != 3 {
            return Err(ConfigError::Validation(
                "store.small only applies to size 3".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            enabled: true,
            size: default_store_size(),
            small: false,
            compressed: false,
        }
    }
}

/// Signature input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSection {
    /// Path of the signature file, one `<decimal-id> <hex-signature>` per
    /// line.
    #[serde(default)]
    pub input: String,

    /// Id of this machine.
    #[serde(default)]
    pub shard_index: u64,

    /// Number of machines the signature space is split across.
    #[serde(default = "default_shard_total")]
    pub shard_total: u64,
}

impl IngestSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.input.is_empty() {
            return Err(ConfigError::Validation(
                "ingest.input must name a signature file".to_string(),
            ));
        }
        if self.shard_total == 0 || self.shard_index >= self.shard_total {
            return Err(ConfigError::Validation(format!(
                "ingest.shard_index {} out of range for shard_total {}",
                self.shard_index, self.shard_total
            )));
        }
        Ok(())
    }
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            input: String::new(),
            shard_index: 0,
            shard_total: default_shard_total(),
        }
    }
}

/// Top-k tree settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VptreeSection {
    #[serde(default = "true_value")]
    pub enabled: bool,
}

impl Default for VptreeSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Helper functions for serde defaults
fn default_config_version() -> String {
    "1.0".to_string()
}
fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_store_size() -> u8 {
    6
}
fn default_shard_total() -> u64 {
    1
}
fn true_value() -> bool {
    true
}
