//! Client Configuration
//!
//! Resolves where the advising API and the university portal live, the
//! request timeout, and the data directory holding sessions and tokens.
//!
//! Precedence, per field: explicit override (CLI flag or environment
//! variable) > `config.toml` in the data directory > built-in default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api/students";
pub const DEFAULT_PORTAL_BASE: &str = "http://127.0.0.1:8000/api/universities";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const DATA_DIR_NAME: &str = ".erasmus-helpdesk";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Student API base, e.g. `http://host:8000/api/students`
    pub api_base: String,
    /// University portal API base
    pub portal_base: String,
    pub timeout_secs: u64,
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            portal_base: DEFAULT_PORTAL_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            data_dir: default_data_dir(),
        }
    }
}

/// Optional values read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub portal_base: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Values given on the command line or in the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub portal_base: Option<String>,
    pub timeout_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

/// Blank strings count as unset.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ClientConfig {
    /// Resolve configuration from overrides and the data directory's file.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let data_dir = overrides.data_dir.clone().unwrap_or_else(default_data_dir);
        let file = load_file_config(&data_dir)?;
        Ok(Self::merge(overrides, file, data_dir))
    }

    fn merge(overrides: ConfigOverrides, file: FileConfig, data_dir: PathBuf) -> Self {
        let api_base = non_blank(overrides.api_base)
            .or_else(|| non_blank(file.api_base))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let portal_base = non_blank(overrides.portal_base)
            .or_else(|| non_blank(file.portal_base))
            .unwrap_or_else(|| DEFAULT_PORTAL_BASE.to_string());
        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let config = Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            portal_base: portal_base.trim_end_matches('/').to_string(),
            timeout_secs,
            data_dir,
        };
        debug!("Resolved config: {:?}", config);
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Persist the URL and timeout settings to `config.toml`.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path(&self.data_dir);
        let file = FileConfig {
            api_base: Some(self.api_base.clone()),
            portal_base: Some(self.portal_base.clone()),
            timeout_secs: Some(self.timeout_secs),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(&file)?;
        std::fs::write(&path, contents).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Config saved to {}", path.display());
        Ok(path)
    }
}

/// A missing file is an empty config.
pub fn load_file_config(data_dir: &Path) -> Result<FileConfig, ConfigError> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::resolve(ConfigOverrides {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.portal_base, DEFAULT_PORTAL_BASE);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_file_then_override_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            config_path(dir.path()),
            "api_base = \"http://files.example/api/students/\"\ntimeout_secs = 30\n",
        )
        .unwrap();

        let config = ClientConfig::resolve(ConfigOverrides {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.api_base, "http://files.example/api/students");
        assert_eq!(config.timeout_secs, 30);

        let config = ClientConfig::resolve(ConfigOverrides {
            api_base: Some("http://flag.example/api/students".to_string()),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.api_base, "http://flag.example/api/students");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = ClientConfig::merge(
            ConfigOverrides {
                api_base: Some("   ".to_string()),
                timeout_secs: Some(0),
                ..Default::default()
            },
            FileConfig::default(),
            PathBuf::from("/tmp/ehd"),
        );
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            api_base: "http://saved.example/api/students".to_string(),
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        config.save().unwrap();

        let file = load_file_config(dir.path()).unwrap();
        assert_eq!(
            file.api_base.as_deref(),
            Some("http://saved.example/api/students")
        );
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(config_path(dir.path()), "api_base = [").unwrap();
        assert!(matches!(
            load_file_config(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
