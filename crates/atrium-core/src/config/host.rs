use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigData;
use crate::config::error::ConfigError;
use crate::extension::descriptor::ModuleDescriptor;
use crate::extension::loader::LoaderSettings;
use crate::kernel::constants;

/// Settings the host starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Re-check interval while waiting for a module to register.
    pub poll_interval_ms: u64,
    /// How long to wait for a delivered module to register.
    pub registration_timeout_ms: u64,
    /// Props whose values act as isolation-boundary reset keys.
    pub reset_props: Vec<String>,
    /// Inline module catalog, merged with discovery results.
    pub modules: Vec<ModuleDescriptor>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            registration_timeout_ms: constants::DEFAULT_REGISTRATION_TIMEOUT_MS,
            reset_props: constants::DEFAULT_RESET_PROPS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            modules: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Build from an already parsed document. Missing keys keep defaults.
    pub fn from_config_data(data: &ConfigData) -> Result<Self, ConfigError> {
        let config: HostConfig =
            serde_json::from_value(data.to_value()).map_err(|e| ConfigError::Deserialization {
                format: "host config".to_string(),
                source: Box::new(e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a host configuration file (JSON, YAML or TOML).
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = ConfigData::load(path).await?;
        let config = Self::from_config_data(&data)?;
        log::info!(
            "Host configuration loaded from {} ({} inline module(s))",
            path.display(),
            config.modules.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.registration_timeout_ms < self.poll_interval_ms {
            return Err(ConfigError::InvalidValue {
                key: "registration_timeout_ms".to_string(),
                message: format!(
                    "must be at least poll_interval_ms ({})",
                    self.poll_interval_ms
                ),
            });
        }
        Ok(())
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            registration_timeout: Duration::from_millis(self.registration_timeout_ms),
        }
    }
}
