//! Application configuration
//!
//! Loaded from a TOML file given with `--config`; every field is optional.
//!
//! ```toml
//! editor_theme = "monokai"
//!
//! [hardware]
//! use_mock = true
//! device = "/dev/ttyACM0"
//! baud_rate = 115200
//!
//! [executor]
//! step_limit = 1000000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use neo_engine::ExecutorConfig;
use neo_hardware::HardwareConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hardware: HardwareConfig,
    pub executor: ExecutorConfig,
    pub editor_theme: String,
    pub app_title: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hardware: HardwareConfig::default(),
            executor: ExecutorConfig::default(),
            editor_theme: "monokai".to_string(),
            app_title: "NEO Robot - Learn Python with Robotics".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults when `path` is absent.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_or_default(None).unwrap();
        assert_eq!(config.editor_theme, "monokai");
        assert_eq!(config.app_title, "NEO Robot - Learn Python with Robotics");
        assert_eq!(config.hardware.upper_arm_pin, 9);
        assert!(!config.hardware.use_mock);
        assert_eq!(config.executor.step_limit, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            "editor_theme = \"dracula\"\n\n[hardware]\nuse_mock = true\nhand_pin = 5\n\n[executor]\nstep_limit = 500\n",
        );
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.editor_theme, "dracula");
        assert!(config.hardware.use_mock);
        assert_eq!(config.hardware.hand_pin, 5);
        assert_eq!(config.hardware.lower_arm_pin, 10);
        assert_eq!(config.executor.step_limit, Some(500));
        assert_eq!(config.executor.recursion_limit, 200);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = write_config("");
        assert_eq!(AppConfig::load(file.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[hardware\nuse_mock = yes");
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid config file"));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let file = write_config("[hardware]\nhand_pin = \"eleven\"");
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
