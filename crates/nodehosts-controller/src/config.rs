//! Controller configuration.

use nodehosts_core::{NodeHostsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the node hosts controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Publish the hosts table at all. When false only credential
    /// cleanup runs.
    #[serde(default = "default_true")]
    pub modify_coredns: bool,

    /// Namespace of the config resource (default: kube-system).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Name of the config resource (default: coredns).
    #[serde(default = "default_config_map")]
    pub config_map: String,

    /// Field holding the hosts blob (default: NodeHosts).
    #[serde(default = "default_hosts_key")]
    pub hosts_key: String,

    /// How the table is written back.
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Extra attempts after a version conflict in compare-and-swap mode.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

/// Write-back strategy for the hosts table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Blind whole-blob overwrite, last writer wins
    #[default]
    Overwrite,
    /// Keep the fetched resource version and retry on conflict
    CompareAndSwap,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            modify_coredns: true,
            namespace: default_namespace(),
            config_map: default_config_map(),
            hosts_key: default_hosts_key(),
            write_mode: WriteMode::default(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

impl ControllerConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| NodeHostsError::Config(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject configs that cannot address a resource.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("namespace", &self.namespace),
            ("config_map", &self.config_map),
            ("hosts_key", &self.hosts_key),
        ] {
            if value.trim().is_empty() {
                return Err(NodeHostsError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Disable or enable publication
    #[must_use]
    pub fn with_modify_coredns(mut self, enabled: bool) -> Self {
        self.modify_coredns = enabled;
        self
    }

    /// Set the write mode
    #[must_use]
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }
}

// Default value functions for serde.
const fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    String::from("kube-system")
}

fn default_config_map() -> String {
    String::from("coredns")
}

fn default_hosts_key() -> String {
    String::from("NodeHosts")
}

const fn default_max_conflict_retries() -> u32 {
    3
}
