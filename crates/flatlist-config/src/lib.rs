use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Where new item and block ids come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random v4 UUIDs
    #[default]
    Random,
    /// 1, 2, 3, ... so repeated runs give identical output
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// One element per line instead of compact output
    pub pretty: bool,
    pub indent_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            indent_width: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory relative document paths are resolved against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_path: Option<PathBuf>,
    pub ids: IdStrategy,
    /// `env_logger` filter used when `RUST_LOG` is not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    pub render: RenderConfig,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded documents path
        config.documents_path = config
            .documents_path
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/flatlist");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Resolve a document path given on the command line. Relative paths
    /// are taken from `documents_path` when one is configured.
    pub fn resolve_document(&self, path: &Path) -> PathBuf {
        let path = Self::expand_path(path).unwrap_or_else(|| path.to_path_buf());
        match &self.documents_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
