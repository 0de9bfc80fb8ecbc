//! Command-line configuration (`colprefix.toml`).
//!
//! ```toml
//! catalog = "models.toml"
//! debug = false
//! log = "colprefix=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ColprefixError, ColprefixResult};

pub const CONFIG_FILE: &str = "colprefix.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Model catalog used when none is given on the command line.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Log buffer write failures while rendering.
    #[serde(default)]
    pub debug: bool,
    /// `tracing` filter directive, e.g. `colprefix=debug`.
    #[serde(default)]
    pub log: Option<String>,
}

impl Config {
    pub fn from_toml_str(content: &str) -> ColprefixResult<Self> {
        toml::from_str(content).map_err(|e| ColprefixError::Config(e.to_string()))
    }

    /// Load from `explicit`, else the first existing default location.
    ///
    /// Missing default files yield the default config; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> ColprefixResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ColprefixError::Config(format!("{} not found", path.display())));
            }
            return Self::read(path);
        }

        match Self::default_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::read(&path),
            None => Ok(Self::default()),
        }
    }

    /// `./colprefix.toml`, then `<config dir>/colprefix/config.toml`.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("colprefix").join("config.toml"));
        }
        paths
    }

    fn read(path: &Path) -> ColprefixResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;

        // Relative catalog paths are relative to the config file.
        if let (Some(catalog), Some(dir)) = (&config.catalog, path.parent()) {
            if catalog.is_relative() && !dir.as_os_str().is_empty() {
                config.catalog = Some(dir.join(catalog));
            }
        }

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
