//! Error types for lakehouse-lite
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors with clear error chains.
//!
//! Missing configuration stops the process before it serves anything.
//! Connection and query failures stay local to the `load_*` call that hit
//! them.

use std::io;

/// Main error type for lakehouse-lite
#[derive(Debug, thiserror::Error)]
pub enum LakehouseError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Failed to open or re-validate a pooled connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// A value could not be coerced to its column's type.
    ///
    /// The sanitizer turns this into a null cell; it never reaches callers.
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// Columns of a table have different lengths
    #[error("Malformed table: {0}")]
    MalformedTable(String),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Config file could not be read
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Required keys resolved to nothing (or only whitespace)
    #[error("Missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),
}

impl ConfigError {
    /// Names of the missing keys, if this is a `Missing` error
    pub fn missing_keys(&self) -> &[String] {
        match self {
            ConfigError::Missing(keys) => keys,
            _ => &[],
        }
    }
}

/// Specialized Result type for lakehouse-lite operations
pub type Result<T> = std::result::Result<T, LakehouseError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
