//! Global Configuration (~/.trial/config.toml)
//!
//! Handles user-level configuration stored in `~/.trial/config.toml`.
//! Runner settings live under a `[defaults]` table and sit below any
//! project configuration.

use crate::project::RunnerConfig;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.trial/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Runner defaults shared by every project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<RunnerConfig>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        if let Some(defaults) = &config.defaults {
            defaults.validate()?;
        }
        Ok(config)
    }

    /// Get the path to the global config file (~/.trial/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".trial").join("config.toml"))
    }

    /// Runner defaults, empty when the file has no `[defaults]` table
    pub fn runner_defaults(&self) -> RunnerConfig {
        self.defaults.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[defaults]\nreporter = \"dot\"\nbail = true\n").unwrap();

        let config = GlobalConfig::load_from_file(&path).unwrap();
        let defaults = config.runner_defaults();
        assert_eq!(defaults.reporter.as_deref(), Some("dot"));
        assert_eq!(defaults.bail, Some(true));
    }

    #[test]
    fn test_empty_file_is_valid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "").unwrap();

        let config = GlobalConfig::load_from_file(&path).unwrap();
        assert_eq!(config.runner_defaults(), RunnerConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = GlobalConfig::load_from_file(&temp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_defaults_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[defaults]\njobs = 0\n").unwrap();

        assert!(GlobalConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_global_config_path_location() {
        if let Ok(path) = GlobalConfig::global_config_path() {
            assert!(path.ends_with(".trial/config.toml"));
        }
    }
}
