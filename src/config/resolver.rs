//! Layered configuration lookup
//!
//! Values are looked up in a fixed order: the secrets file first, then the
//! process environment, then the caller's default. A source that is missing,
//! unreadable or malformed never fails the lookup; it is skipped.
//!
//! Nothing is cached here. Callers that need a stable view take a snapshot
//! once at startup (see [`DbSettings::resolve`](super::DbSettings::resolve)).

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single place configuration values can come from
pub trait ConfigSource: Send + Sync {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Look up `key`.
    ///
    /// `Ok(None)` means the source is reachable but has no such key.
    /// `Err` means the source itself is unavailable; the resolver skips it.
    fn lookup(&self, key: &str) -> ConfigResult<Option<String>>;
}

/// TOML secrets file, optionally scoped to one `[section]`
#[derive(Debug, Clone)]
pub struct SecretsFile {
    path: PathBuf,
    section: Option<String>,
}

impl SecretsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            section: None,
        }
    }

    /// Only look at keys under `[section]`
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Default secrets location (`~/.lakehouse/secrets.toml`)
    pub fn default_path() -> ConfigResult<PathBuf> {
        Ok(super::config_dir()?.join("secrets.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for SecretsFile {
    fn name(&self) -> &str {
        "secrets"
    }

    fn lookup(&self, key: &str) -> ConfigResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ConfigError::NotFound(format!(
                "Failed to read secrets file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let root: toml::Table = toml::from_str(&content)?;

        let table = match &self.section {
            Some(section) => match root.get(section).and_then(toml::Value::as_table) {
                Some(t) => t,
                None => return Ok(None),
            },
            None => &root,
        };

        Ok(table.get(key).and_then(toml_value_to_string))
    }
}

/// Stringify scalar TOML values; tables and arrays are not settings
fn toml_value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct Environment;

impl ConfigSource for Environment {
    fn name(&self) -> &str {
        "env"
    }

    fn lookup(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(std::env::var(key).ok())
    }
}

/// In-memory key/value source
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    name: String,
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }
}

/// Ordered set of configuration sources; first hit wins
#[derive(Default)]
pub struct ConfigResolver {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
    /// Resolver with no sources (every lookup yields the default)
    pub fn new() -> Self {
        Self::default()
    }

    /// Secrets file, then environment
    pub fn standard(secrets: SecretsFile) -> Self {
        Self::new().with_source(secrets).with_source(Environment)
    }

    /// Append a source with lower precedence than those already added
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Resolve `key`, falling back to `default` when no source has it
    pub fn resolve(&self, key: &str, default: Option<&str>) -> Option<String> {
        for source in &self.sources {
            match source.lookup(key) {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        source = source.name(),
                        key,
                        error = %e,
                        "config source unavailable, falling through"
                    );
                }
            }
        }
        default.map(str::to_string)
    }

    /// Resolve `key`, failing when it is absent or blank
    pub fn resolve_required(&self, key: &str) -> ConfigResult<String> {
        self.resolve(key, None)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing(vec![key.to_string()]))
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("ConfigResolver")
            .field("sources", &names)
            .finish()
    }
}
