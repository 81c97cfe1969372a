//! Runtime configuration, loaded from TOML.
//!
//! Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! data_dir = "data"
//! snapshot_dir = "data_snapshots"
//! offline = false
//! remote = "synthetic"
//! compression = "zstd"
//! zstd_level = 3
//! auto_split = true
//!
//! [alignment]
//! fallback_tolerance_secs = 60.0
//! scatter_floor_factor = 0.1
//! ```

use plotbot_core::align::{AlignMethod, DEFAULT_FLOOR_FACTOR};
use plotbot_core::snapshot::Compression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where "downloads" come from when local files do not cover a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKind {
    #[default]
    None,
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionKind {
    #[default]
    None,
    Zstd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Tolerance for nearest-with-tolerance alignment when the target grid
    /// has fewer than two points. `None` makes that case an error.
    pub fallback_tolerance_secs: Option<f64>,
    /// Scatter filler = smallest positive source value times this factor.
    pub scatter_floor_factor: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            fallback_tolerance_secs: None,
            scatter_floor_factor: DEFAULT_FLOOR_FACTOR,
        }
    }
}

impl AlignmentConfig {
    pub fn tolerance_method(&self) -> AlignMethod {
        AlignMethod::NearestWithTolerance {
            fallback_tolerance: self.fallback_tolerance_secs,
        }
    }

    pub fn scatter_method(&self) -> AlignMethod {
        AlignMethod::Scatter {
            floor_factor: self.scatter_floor_factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotbotConfig {
    /// Directory of already-downloaded raw files (one CSV per data type).
    pub data_dir: PathBuf,
    /// Default directory for snapshot files.
    pub snapshot_dir: PathBuf,
    /// Never use the remote source.
    pub offline: bool,
    pub remote: RemoteKind,
    pub compression: CompressionKind,
    pub zstd_level: i32,
    /// Split instances on time gaps when saving snapshots.
    pub auto_split: bool,
    pub alignment: AlignmentConfig,
}

impl Default for PlotbotConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            snapshot_dir: PathBuf::from("data_snapshots"),
            offline: false,
            remote: RemoteKind::None,
            compression: CompressionKind::None,
            zstd_level: 3,
            auto_split: true,
            alignment: AlignmentConfig::default(),
        }
    }
}

impl PlotbotConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PlotbotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tol) = self.alignment.fallback_tolerance_secs {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "alignment.fallback_tolerance_secs must be positive, got {tol}"
                )));
            }
        }
        let factor = self.alignment.scatter_floor_factor;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "alignment.scatter_floor_factor must be positive, got {factor}"
            )));
        }
        if !(1..=22).contains(&self.zstd_level) {
            return Err(ConfigError::Invalid(format!(
                "zstd_level must be in 1..=22, got {}",
                self.zstd_level
            )));
        }
        Ok(())
    }

    pub fn compression(&self) -> Compression {
        match self.compression {
            CompressionKind::None => Compression::None,
            CompressionKind::Zstd => Compression::Zstd {
                level: self.zstd_level,
            },
        }
    }
}
