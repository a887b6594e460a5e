//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Thread view settings
    #[serde(default)]
    pub view: ViewConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thread view settings
#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    /// Maximum number of threads kept in the current-thread history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Maximum number of entries in the breakpoint-hit navigation menu
    #[serde(default = "default_max_menu_items")]
    pub max_menu_items: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_menu_items: default_max_menu_items(),
        }
    }
}

fn default_history_limit() -> usize {
    32
}
fn default_max_menu_items() -> usize {
    10
}

/// Logging settings
#[derive(Debug, Deserialize, Default)]
pub struct LoggingConfig {
    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.view.history_limit == 0 {
            return Err(Error::Config(
                "view.history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.view.history_limit, 32);
        assert_eq!(config.view.max_menu_items, 10);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[view]\nhistory_limit = 4").unwrap();

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.view.history_limit, 4);
        assert_eq!(config.view.max_menu_items, 10);
    }

    #[test]
    fn test_zero_history_limit_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[view]\nhistory_limit = 0").unwrap();

        let err = Config::from_path(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[view\nhistory_limit = ").unwrap();

        let err = Config::from_path(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
