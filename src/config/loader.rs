//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. TOML file (explicit `--config` path, else `fitplan.toml` when present)
//! 3. Environment variables (FITPLAN_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::types::{FitError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default config file looked up in the working directory
    pub const DEFAULT_FILE: &'static str = "fitplan.toml";

    /// Environment prefix, e.g. `FITPLAN_LLM__MODEL` -> `llm.model`
    pub const ENV_PREFIX: &'static str = "FITPLAN_";

    /// Load configuration with full resolution chain:
    /// defaults → file → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(FitError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                debug!("Loading config from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    debug!("Loading config from: {}", default_path.display());
                    figment = figment.merge(Toml::file(&default_path));
                }
            }
        }

        figment = figment.merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        let config = Self::extract(figment)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path));
        let config = Self::extract(figment)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from(Self::DEFAULT_FILE)
    }

    fn extract(figment: Figment) -> Result<Config> {
        figment
            .extract()
            .map_err(|e| FitError::Config(format!("Configuration error: {}", e)))
    }
}
