//! Warehouse access trait
//!
//! The read operations only need "run this fixed statement with these bound
//! parameters and give me a table". Keeping that behind a trait lets the
//! query layer run against a substitute warehouse in tests.

use crate::db::types::Table;
use crate::error::Result;
use std::future::Future;
use tokio_postgres::types::ToSql;

/// A parameter value bound to a `$n` placeholder.
///
/// Parameters are never spliced into statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

impl SqlParam {
    /// Borrow as a postgres-bindable value
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlParam::Int(v) => v,
            SqlParam::Text(s) => s,
        }
    }
}

/// Read-only access to the analytics warehouse
pub trait Warehouse: Send + Sync {
    /// Execute a read-only statement and return its rows as a table
    ///
    /// # Errors
    /// Returns `ConfigError` if connection settings can't be resolved,
    /// `DbError::ConnectionFailed` if no live connection is available and
    /// `DbError::QueryFailed` if the statement itself fails
    fn fetch(&self, sql: &str, params: &[SqlParam]) -> impl Future<Output = Result<Table>> + Send;
}
