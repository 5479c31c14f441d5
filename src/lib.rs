//! lakehouse-lite - read-through query cache for a PostgreSQL analytics dashboard
//!
//! The dashboard shows a handful of fixed queries over mart tables built by
//! an external transform job. This crate sits between the renderer and the
//! warehouse: it resolves connection settings, keeps one pooled connection
//! provider for the process, caches each query's result for a fixed TTL and
//! sanitizes results so a generic table renderer can always display them.
//!
//! # Architecture
//!
//! - [`config`]: layered settings lookup (secrets file, then environment)
//! - [`db`]: connection provider, the [`db::Warehouse`] seam and result types
//! - [`cache`]: time-to-live read-through cache keyed by query and parameters
//! - [`sanitize`]: coercion of results to renderer-safe primitives
//! - [`queries`]: the dashboard's fixed read operations
//! - [`export`]: text / CSV / JSON rendering of tables
//! - [`error`]: error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lakehouse_lite::cache::{CacheTtl, QueryCache};
//! use lakehouse_lite::config::{ConfigResolver, SecretsFile};
//! use lakehouse_lite::db::{ConnectionProvider, PoolSettings, PostgresWarehouse};
//! use lakehouse_lite::queries::Dashboard;
//! use lakehouse_lite::sanitize::SpeciesPolicy;
//!
//! # async fn example() -> lakehouse_lite::Result<()> {
//! let resolver = ConfigResolver::standard(SecretsFile::new(SecretsFile::default_path()?));
//! let provider = Arc::new(ConnectionProvider::new(resolver, PoolSettings::default()));
//! let cache = Arc::new(QueryCache::new(CacheTtl::default()));
//! let dashboard = Dashboard::new(
//!     PostgresWarehouse::new(provider),
//!     cache,
//!     SpeciesPolicy::PassThrough,
//! );
//!
//! let metrics = dashboard.load_metrics().await?;
//! println!("{} penguins", metrics.total_entities);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod queries;
pub mod sanitize;

pub use error::{ConfigError, DbError, LakehouseError, Result};
