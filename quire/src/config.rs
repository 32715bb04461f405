//! The optional `quire.json` configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quire_core::{CatalogOptions, PathOverrides, ScanFailurePolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "quire.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub paths: PathOverrides,
    pub pattern: Option<String>,
    pub scan_failure: Option<ScanFailurePolicy>,
}

impl Config {
    /// Loads `explicit` if given (it must exist), otherwise `quire.json` in `base` if it exists,
    /// otherwise the defaults.
    pub fn load(explicit: Option<&Path>, base: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = base.join(CONFIG_FILE_NAME);
                if !path.is_file() {
                    debug!("No {CONFIG_FILE_NAME} in {}, using defaults", base.display());
                    return Ok(Config::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies the `--content` flag.
    pub fn with_content(mut self, content: Option<PathBuf>) -> Self {
        if content.is_some() {
            self.paths.content = content;
        }
        self
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        let defaults = CatalogOptions::default();
        CatalogOptions {
            pattern: self.pattern.clone().unwrap_or(defaults.pattern),
            scan_failure: self.scan_failure.unwrap_or(defaults.scan_failure),
        }
    }
}
