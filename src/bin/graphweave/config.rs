use std::fs;
use std::path::{Path, PathBuf};

use graphweave::DecodeConfig;
use serde::Deserialize;
use thiserror::Error;

use super::{OutputFormat, ThemeArg};

/// Settings read from the CLI's TOML file; flags override them.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let from_flag = explicit.is_some();
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            Some(config_path) if from_flag => {
                return Err(ConfigError::Missing {
                    path: config_path.clone(),
                })
            }
            _ => RawConfig::default(),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn decode(&self) -> DecodeConfig {
        self.data.decode
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.data.cli.format
    }

    pub fn theme(&self) -> Option<ThemeArg> {
        self.data.cli.theme
    }

    pub fn log_level(&self) -> Option<&str> {
        self.data.cli.log_level.as_deref()
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    decode: DecodeConfig,
    #[serde(default)]
    cli: CliSection,
}

#[derive(Debug, Default, Deserialize)]
struct CliSection {
    format: Option<OutputFormat>,
    theme: Option<ThemeArg>,
    log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("CLI config {path} does not exist")]
    Missing { path: PathBuf },
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("graphweave").join("config.toml"))
}
