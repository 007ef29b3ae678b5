//! CLI configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory holding the dashboard data files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Environment variable carrying the master encryption key.
    #[serde(default = "default_master_key_env")]
    pub master_key_env: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/dockhand")
}

fn default_master_key_env() -> String {
    "DOCKHAND_MASTER_KEY".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            master_key_env: default_master_key_env(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dirs = directories::ProjectDirs::from("dev", "dockhand", "dockhand")
            .ok_or("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("vault.json")
    }

    pub fn stacks_path(&self) -> PathBuf {
        self.data_dir.join("stacks.json")
    }

    pub fn env_vars_path(&self) -> PathBuf {
        self.data_dir.join("env_vars.json")
    }
}
