//! Decoder configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

/// Knobs for one decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Links followed by a single lookup before it is treated as a cycle.
    pub max_reference_hops: usize,
    /// Fail on leaf selections that meet an undecodable value; when false
    /// such values decode as unknown.
    pub strict_leaves: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_reference_hops: 32,
            strict_leaves: true,
        }
    }
}

impl DecodeConfig {
    /// Short link chains, hard failures.
    pub fn strict() -> Self {
        Self {
            max_reference_hops: 8,
            strict_leaves: true,
        }
    }

    /// Long link chains; odd leaves decode as unknown.
    pub fn permissive() -> Self {
        Self {
            max_reference_hops: 256,
            strict_leaves: false,
        }
    }

    /// Parses a `[decode]` table from TOML text; missing keys keep defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        #[derive(Deserialize, Default)]
        struct File {
            #[serde(default)]
            decode: DecodeConfig,
        }
        let file: File = toml::from_str(text).map_err(|err| DecodeError::Config(err.to_string()))?;
        Ok(file.decode)
    }

    /// Loads a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_defaults() {
        let config = DecodeConfig::from_toml_str("[decode]\nstrict_leaves = false\n").unwrap();
        assert!(!config.strict_leaves);
        assert_eq!(config.max_reference_hops, 32);
        assert_eq!(DecodeConfig::from_toml_str("").unwrap(), DecodeConfig::default());
    }

    #[test]
    fn presets() {
        let strict = DecodeConfig::strict();
        assert_eq!(strict.max_reference_hops, 8);
        assert!(strict.strict_leaves);
        let permissive = DecodeConfig::permissive();
        assert_eq!(permissive.max_reference_hops, 256);
        assert!(!permissive.strict_leaves);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = DecodeConfig::from_toml_str("[decode]\nmax_reference_hops = \"x\"").unwrap_err();
        assert_eq!(err.code(), "Config");
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DecodeConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DecodeConfig::default());
    }
}
