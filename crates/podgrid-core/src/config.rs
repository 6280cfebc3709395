//! podgrid.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SpecError, SpecResult};
use crate::types::ServiceSpec;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodgridConfig {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateConfig {
    /// Path of the redb file holding configurations and task records.
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/podgrid/state.redb"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Mailbox size of the plan coordinator.
    pub command_buffer: usize,
    /// Decline offers that no step consumed at the end of each pass.
    pub decline_unused_offers: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            decline_unused_offers: true,
        }
    }
}

impl PodgridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PodgridConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl ServiceSpec {
    /// Parse and validate a service spec from TOML.
    pub fn from_toml_str(content: &str) -> SpecResult<Self> {
        let spec: ServiceSpec =
            toml::from_str(content).map_err(|e| SpecError::Parse(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }
}
