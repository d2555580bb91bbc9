use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_confirm_deletes")]
    pub confirm_deletes: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            confirm_deletes: default_confirm_deletes(),
            log_level: default_log_level(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

fn default_storage_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    Config::default_storage_path_for_profile(utils::Profile::Prod)
}

fn default_confirm_deletes() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from the profile's config file, or create a default if missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        let mut config = Self::load_from(&config_path)?;
        if !config_path.exists() {
            // First run: pin the storage file to this profile's data directory
            config.storage_path = Self::default_storage_path_for_profile(profile);
            config.save_to(&config_path)?;
        }
        Ok(config)
    }

    /// Load configuration from an explicit file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents =
                fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `path`, creating parent directories as needed
    pub fn save_to(&mut self, path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default storage path for a specific profile
    fn default_storage_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("tasks.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/tdl-dev/tasks.db".to_string(),
                utils::Profile::Prod => "~/.local/share/tdl/tasks.db".to_string(),
            }
        }
    }

    /// Get the expanded storage path (with ~ expansion)
    pub fn get_storage_path(&self) -> PathBuf {
        utils::expand_path(&self.storage_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str("storage_path = \"/tmp/x.db\"").unwrap();
        assert_eq!(config.storage_path, "/tmp/x.db");
        assert!(config.confirm_deletes);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn save_then_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config {
            storage_path: "/tmp/tasks.db".to_string(),
            confirm_deletes: false,
            log_level: "debug".to_string(),
            config_version: None,
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.storage_path, "/tmp/tasks.db");
        assert!(!loaded.confirm_deletes);
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "confirm_deletes = maybe").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
