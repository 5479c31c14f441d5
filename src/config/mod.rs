//! Configuration management
//!
//! Layered lookup of connection secrets plus the settings file.

pub mod connections;
pub mod resolver;
pub mod settings;

pub use connections::{DbSettings, SslMode};
pub use resolver::{ConfigResolver, ConfigSource, Environment, MapSource, SecretsFile};
pub use settings::{Settings, load_settings};

use crate::error::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Get the config directory path (~/.lakehouse/)
pub fn config_dir() -> ConfigResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".lakehouse"))
}
