//! # Atrium Core Configuration
//!
//! Host configuration and module catalogs are plain key/value documents in
//! JSON, YAML (`yaml-config` feature) or TOML (`toml-config` feature). The
//! format is picked from the file extension.
//!
//! - [`ConfigFormat`] / [`ConfigData`]: the format-agnostic document layer.
//! - [`host::HostConfig`]: the typed settings the host starts from.
//! - [`error::ConfigError`]: everything that can go wrong reading them.
pub mod error;
pub mod host;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::error::ConfigError;

pub use host::HostConfig;

type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// In-memory representation of configuration data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    /// Raw configuration values
    #[serde(flatten)]
    values: HashMap<String, Value>,
}

impl ConfigData {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a configuration value, `None` if missing or of the wrong shape
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.try_get(key).ok().flatten()
    }

    /// Get a configuration value, reporting values of the wrong shape
    pub fn try_get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> ConfigResult<Option<T>> {
        self.values
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    /// Get a configuration value with default
    pub fn get_or<T: for<'de> Deserialize<'de>>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> ConfigResult<()> {
        let json_value = serde_json::to_value(value).map_err(|e| ConfigError::Serialization {
            format: "json".to_string(),
            source: Box::new(e),
        })?;
        self.values.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Check if key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Merge with another config, overriding existing values
    pub fn merge(&mut self, other: &ConfigData) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// All values as one JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> ConfigResult<String> {
        let failed = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::Serialization {
            format: format.extension().to_string(),
            source,
        };
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(&self).map_err(|e| failed(Box::new(e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(&self).map_err(|e| failed(Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(&self).map_err(|e| failed(Box::new(e))),
        }
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> ConfigResult<Self> {
        let failed = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::Deserialization {
            format: format.extension().to_string(),
            source,
        };
        match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| failed(Box::new(e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| failed(Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| failed(Box::new(e))),
        }
    }

    /// Read and parse a configuration file, format chosen by extension
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                operation: "read".to_string(),
                source,
            })?;
        log::debug!("Loaded {} configuration from {}", format.extension(), path.display());
        Self::deserialize(&contents, format)
    }
}
