//! TOML run configuration.
//!
//! Every field has a default, so an absent or partial file is valid.
//! Command-line flags are applied on top by [`Config::with_overrides`].

use std::path::Path;

use report_watch_detect_models::GridConfig;
use report_watch_series::loader::CsvLayout;
use report_watch_series_models::Grouping;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error (file read).
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path of the config file.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// TOML parsing failed.
    #[error("TOML error in {path}: {source}")]
    Toml {
        /// Path of the config file.
        path: String,
        /// Underlying error.
        source: toml::de::Error,
    },
}

/// Complete run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How rows are grouped into entities.
    pub grouping: Grouping,
    /// Number of top-ranked entities to report. `None` reports all.
    pub top_k: Option<usize>,
    /// Input CSV layout.
    pub columns: CsvLayout,
    /// Slack and threshold axes.
    pub grid: GridConfig,
}

impl Config {
    /// Reads `path`, or returns the defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            log::debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        log::info!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&text).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if `text` is not a valid configuration.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(text)
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, grouping: Option<Grouping>, top_k: Option<usize>) -> Self {
        if let Some(grouping) = grouping {
            self.grouping = grouping;
        }
        if top_k.is_some() {
            self.top_k = top_k;
        }
        self
    }
}
