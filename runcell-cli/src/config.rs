//! Configuration parsing (`runcell.yml`).

use runcell_runtime::{CaptureOptions, KernelConfig, Preload};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the runcell.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How the Python kernel is started
    #[serde(default)]
    pub interpreter: KernelConfig,

    /// Imports, installs and bootstrap code run before any cell
    #[serde(default = "Preload::new")]
    pub preload: Preload,

    #[serde(default)]
    pub capture: CaptureOptions,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpreter: KernelConfig::default(),
            preload: Preload::new(),
            capture: CaptureOptions::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Like [`Config::from_file`], but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Kernel settings with the working directory resolved against the config file
    pub fn kernel_config(&self) -> KernelConfig {
        let mut kernel = self.interpreter.clone();
        kernel.working_dir = kernel.working_dir.map(|dir| self.resolve_path(&dir));
        kernel
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_deref().and_then(Path::parent) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }
}
