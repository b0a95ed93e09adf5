/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::registries::builtin::{DETECTOR_DOG, LINKER_SIMPLE_LAP};

const CONFIG_DIR_NAME: &str = "trackshell";
const CONFIG_FILE_NAME: &str = "trackshell.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    pub max_steps: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max_steps: 128 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub default_detector: String,
    pub default_linker: String,
    pub num_timepoints: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_detector: DETECTOR_DOG.to_string(),
            default_linker: LINKER_SIMPLE_LAP.to_string(),
            num_timepoints: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackshellConfig {
    pub undo: UndoConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config file {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config file {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl TrackshellConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// `<config dir>/trackshell/trackshell.toml`, if the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn empty_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();

        let config = TrackshellConfig::load(file.path()).unwrap();

        assert_eq!(config, TrackshellConfig::default());
        assert_eq!(config.undo.max_steps, 128);
        assert_eq!(config.tracking.default_detector, "DoG detector");
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[tracking]\ndefault_linker = \"LAP linker\"\nnum_timepoints = 30").unwrap();

        let config = TrackshellConfig::load(file.path()).unwrap();

        assert_eq!(config.tracking.default_linker, "LAP linker");
        assert_eq!(config.tracking.num_timepoints, 30);
        assert_eq!(config.tracking.default_detector, "DoG detector");
        assert_eq!(config.undo, UndoConfig::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[undo]\nmax_steps = \"many\"").unwrap();

        let err = TrackshellConfig::load(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse config file"));
    }

    #[test]
    fn missing_file_is_io_error_or_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(matches!(
            TrackshellConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(
            TrackshellConfig::load_or_default(&path).unwrap(),
            TrackshellConfig::default()
        );
    }

    #[test]
    fn serialized_defaults_parse_back() {
        let text = toml::to_string(&TrackshellConfig::default()).unwrap();
        let parsed = TrackshellConfig::from_toml_str(&text, Path::new("inline")).unwrap();
        assert_eq!(parsed, TrackshellConfig::default());
    }
}
