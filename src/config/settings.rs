//! Application settings
//!
//! Non-secret tuning knobs stored in ~/.lakehouse/config.toml. Every field
//! has a default, so a missing file or a partial file is fine.

use crate::cache::CacheTtl;
use crate::db::pool::PoolSettings;
use crate::error::{ConfigError, ConfigResult};
use crate::sanitize::SpeciesPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_ttl_secs")]
    pub summary_ttl_secs: u64,

    #[serde(default = "default_ttl_secs")]
    pub raw_sample_ttl_secs: u64,

    #[serde(default = "default_sample_limit")]
    pub default_sample_limit: u32,

    /// Whether the raw sample drops rows with unknown species
    #[serde(default)]
    pub raw_sample_species: SpeciesPolicy,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Server-side statement timeout; unset means no limit
    #[serde(default)]
    pub statement_timeout_secs: Option<u64>,

    /// Period of the expired-entry sweep; unset means lazy expiry only
    #[serde(default)]
    pub reaper_interval_secs: Option<u64>,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_sample_limit() -> u32 {
    10
}

fn default_pool_max_size() -> usize {
    4
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            summary_ttl_secs: default_ttl_secs(),
            raw_sample_ttl_secs: default_ttl_secs(),
            default_sample_limit: default_sample_limit(),
            raw_sample_species: SpeciesPolicy::default(),
            pool_max_size: default_pool_max_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            statement_timeout_secs: None,
            reaper_interval_secs: None,
        }
    }
}

impl Settings {
    /// Default settings location (`~/.lakehouse/config.toml`)
    pub fn default_path() -> ConfigResult<PathBuf> {
        Ok(super::config_dir()?.join("config.toml"))
    }

    pub fn cache_ttl(&self) -> CacheTtl {
        CacheTtl {
            summary: Duration::from_secs(self.summary_ttl_secs),
            raw_sample: Duration::from_secs(self.raw_sample_ttl_secs),
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_size: self.pool_max_size.max(1),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            statement_timeout: self.statement_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn reaper_interval(&self) -> Option<Duration> {
        self.reaper_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Load settings from `path`, or defaults if the file doesn't exist
pub fn load_settings(path: &Path) -> ConfigResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::NotFound(format!(
            "Failed to read settings file {}: {}",
            path.display(),
            e
        ))
    })?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}
