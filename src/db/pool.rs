//! Pooled warehouse connections
//!
//! [`ConnectionProvider`] owns one connection pool for the life of the
//! process. The pool is built lazily on first use and exactly once; every
//! later call hands back the same pool without touching configuration again.
//!
//! Connections are verified on checkout (`RecyclingMethod::Verified`), so a
//! connection the server has dropped is discarded and replaced instead of
//! being handed to a caller.

use crate::config::{ConfigResolver, DbSettings, SslMode};
use crate::error::{DbError, DbResult, LakehouseError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_postgres::NoTls;

/// Pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of open connections
    pub max_size: usize,
    /// TCP connect timeout, also used as the checkout wait limit
    pub connect_timeout: Duration,
    /// Server-side `statement_timeout` for every session
    pub statement_timeout: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 4,
            connect_timeout: Duration::from_secs(10),
            statement_timeout: None,
        }
    }
}

/// Lazily-initialized connection pool
pub struct ConnectionProvider {
    resolver: ConfigResolver,
    settings: PoolSettings,
    pool: OnceCell<Pool>,
}

impl ConnectionProvider {
    pub fn new(resolver: ConfigResolver, settings: PoolSettings) -> Self {
        Self {
            resolver,
            settings,
            pool: OnceCell::new(),
        }
    }

    /// Get the shared pool, building it on first call.
    ///
    /// Building the pool resolves configuration but opens no connection, so
    /// missing settings fail here before any network attempt.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` listing every missing key, or
    /// `DbError::ConnectionFailed` if the descriptor is unusable
    pub async fn get_connection(&self) -> Result<&Pool> {
        self.pool
            .get_or_try_init(|| async {
                let db = DbSettings::resolve(&self.resolver)?;
                let pool = build_pool(&db, &self.settings)?;
                tracing::info!(
                    url = %db.redacted_url(),
                    max_size = self.settings.max_size,
                    "warehouse connection pool created"
                );
                Ok::<_, LakehouseError>(pool)
            })
            .await
    }

    /// Check out a live pooled client
    ///
    /// # Errors
    /// Returns `DbError::ConnectionFailed` if no live connection can be
    /// obtained within the connect timeout
    pub async fn checkout(&self) -> Result<Object> {
        let pool = self.get_connection().await?;
        let client = pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to check out warehouse connection");
            DbError::ConnectionFailed(e.to_string())
        })?;
        Ok(client)
    }

    /// Whether the pool has been built yet
    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }
}

/// Build a pool from resolved settings (no connection is opened)
pub fn build_pool(db: &DbSettings, settings: &PoolSettings) -> DbResult<Pool> {
    let mut pg_config: tokio_postgres::Config = db
        .connection_url()
        .parse()
        .map_err(|e: tokio_postgres::Error| {
            DbError::ConnectionFailed(format!("Invalid connection descriptor: {}", e))
        })?;
    pg_config.connect_timeout(settings.connect_timeout);
    if let Some(timeout) = settings.statement_timeout {
        pg_config.options(&format!("-c statement_timeout={}", timeout.as_millis()));
    }

    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Verified,
    };
    let manager = match db.ssl_mode {
        SslMode::Disable => Manager::from_config(pg_config, NoTls, manager_config),
        SslMode::Prefer | SslMode::Require => {
            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
            Manager::from_config(pg_config, tls, manager_config)
        }
    };

    Pool::builder(manager)
        .max_size(settings.max_size)
        .runtime(Runtime::Tokio1)
        .wait_timeout(Some(settings.connect_timeout))
        .create_timeout(Some(settings.connect_timeout))
        .build()
        .map_err(|e| DbError::ConnectionFailed(format!("Failed to create pool: {}", e)))
}

/// Build a rustls ClientConfig that trusts OS certificates (with Mozilla roots as fallback)
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    let mut loaded = 0;
    for cert in native_certs.certs {
        if root_store.add(cert).is_ok() {
            loaded += 1;
        }
    }
    if loaded == 0 {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}
