//! Configuration defaults
//!
//! Handles:
//! - Agent port, request timeout and polling mode
//! - Default refresh interval offered at the prompt
//! - History log location
//!
//! The file is optional and only ever read; operator answers and drive
//! selections are not stored.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::agent::DEFAULT_TIMEOUT;

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV: &str = "POOL_PARTY_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Label used in console output
    pub pool_name: String,
    pub agent: AgentSettings,
    pub poll: PollSettings,
    pub history: HistorySettings,
    pub prompt: PromptSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub default_port: u16,
    pub timeout_secs: u64,
    pub concurrent_fetch: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub default_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Word that ends the host list
    pub host_sentinel: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pool_name: "Pool Party".to_string(),
            agent: AgentSettings::default(),
            poll: PollSettings::default(),
            history: HistorySettings::default(),
            prompt: PromptSettings::default(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            default_port: 61208,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            concurrent_fetch: false,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self { default_interval_secs: 300 }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { path: PathBuf::from("storage_data.csv") }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self { host_sentinel: "done".to_string() }
    }
}

impl AgentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl MonitorConfig {
    /// Load config from `$POOL_PARTY_CONFIG` or the OS config directory
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get config file path, honouring the environment override
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        path.push("pool-party");
        path.push("config.toml");
        Ok(path)
    }
}
