//! Database access layer
//!
//! Pooled connections, the warehouse abstraction, and the tabular types
//! query results are carried in.

pub mod pool;
pub mod postgres;
pub mod types;
pub mod warehouse;

// Re-export main types
pub use pool::{ConnectionProvider, PoolSettings};
pub use postgres::PostgresWarehouse;
pub use types::{CellValue, Column, ColumnKind, DataType, Table};
pub use warehouse::{SqlParam, Warehouse};
