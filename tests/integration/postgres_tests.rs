//! Integration tests for PostgresWarehouse
//!
//! These tests require the test PostgreSQL database to be running and skip
//! themselves when it isn't reachable. Point the TEST_DB_* variables at a
//! disposable database.

use lakehouse_lite::config::{ConfigResolver, MapSource};
use lakehouse_lite::db::types::{CellValue, DataType};
use lakehouse_lite::db::{ConnectionProvider, PoolSettings, PostgresWarehouse, SqlParam, Warehouse};
use lakehouse_lite::error::{DbError, LakehouseError};
use lakehouse_lite::sanitize::sanitize;
use std::sync::Arc;
use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Resolver over the TEST_DB_* variables
fn test_resolver() -> ConfigResolver {
    ConfigResolver::new().with_source(
        MapSource::new("test")
            .with("DB_HOST", env_or("TEST_DB_HOST", "localhost"))
            .with("DB_PORT", env_or("TEST_DB_PORT", "5433"))
            .with("DB_NAME", env_or("TEST_DB_NAME", "test_db"))
            .with("DB_USER", env_or("TEST_DB_USER", "test_user"))
            .with("DB_PASSWORD", env_or("TEST_DB_PASSWORD", "test_password"))
            .with("DB_SSLMODE", "disable"),
    )
}

/// A warehouse on the test database, or `None` if it isn't reachable
async fn connect() -> Option<PostgresWarehouse> {
    let settings = PoolSettings {
        max_size: 2,
        connect_timeout: Duration::from_secs(2),
        statement_timeout: Some(Duration::from_secs(5)),
    };
    let provider = Arc::new(ConnectionProvider::new(test_resolver(), settings));
    match provider.checkout().await {
        Ok(_) => Some(PostgresWarehouse::new(provider)),
        Err(e) => {
            eprintln!("Skipping test: Database not available - {}", e);
            None
        }
    }
}

#[tokio::test]
async fn test_fetch_simple_query() {
    let Some(warehouse) = connect().await else {
        return;
    };

    let table = warehouse
        .fetch("SELECT 1::int AS num, 'hello'::text AS msg", &[])
        .await
        .unwrap();
    assert_eq!(table.column_names(), ["num", "msg"]);
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.columns()[0].data_type, DataType::Integer);
    assert_eq!(table.columns()[0].values[0], CellValue::Integer(1));
    assert_eq!(table.columns()[1].values[0], CellValue::Text("hello".to_string()));
}

#[tokio::test]
async fn test_fetch_binds_parameters() {
    let Some(warehouse) = connect().await else {
        return;
    };

    let table = warehouse
        .fetch(
            "SELECT n FROM generate_series(1, 100) AS n ORDER BY n LIMIT $1",
            &[SqlParam::Int(4)],
        )
        .await
        .unwrap();
    assert_eq!(table.row_count(), 4);

    let echoed = warehouse
        .fetch("SELECT $1::text AS s", &[SqlParam::Text("'; DROP TABLE x; --".to_string())])
        .await
        .unwrap();
    assert_eq!(
        echoed.columns()[0].values[0],
        CellValue::Text("'; DROP TABLE x; --".to_string())
    );
}

#[tokio::test]
async fn test_numeric_and_awkward_types_sanitize() {
    let Some(warehouse) = connect().await else {
        return;
    };

    let table = warehouse
        .fetch(
            "SELECT 3368.8::numeric AS mass, 'NaN'::float8 AS bad, \
             '{\"a\": 1}'::jsonb AS doc, now() AS ts, ARRAY[1, 2] AS arr, NULL::text AS missing",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(table.columns()[0].data_type, DataType::Numeric);
    assert_eq!(
        table.columns()[0].values[0],
        CellValue::Text("3368.8".to_string())
    );

    let clean = sanitize(&table);
    assert_eq!(clean.columns()[0].values[0], CellValue::Float(3368.8));
    assert!(clean.columns()[1].values[0].is_null());
    assert_eq!(
        clean.columns()[4].values[0],
        CellValue::Text("{1,2}".to_string())
    );
    for column in clean.columns() {
        assert!(column.values.iter().all(CellValue::is_primitive));
    }
}

#[tokio::test]
async fn test_unmapped_types_read_as_text() {
    let Some(warehouse) = connect().await else {
        return;
    };

    let table = warehouse
        .fetch(
            "SELECT '1 day 02:00:00'::interval AS span, '10.0.0.1'::inet AS addr, \
             '10.0.0.0/8'::cidr AS net, 26::oid AS rel, point(1, 2) AS pt",
            &[],
        )
        .await
        .unwrap();
    let row: Vec<&CellValue> = table.columns().iter().map(|c| &c.values[0]).collect();
    assert_eq!(row[0], &CellValue::Text("1 day 02:00:00".to_string()));
    assert_eq!(row[1], &CellValue::Text("10.0.0.1".to_string()));
    assert_eq!(row[2], &CellValue::Text("10.0.0.0/8".to_string()));
    assert_eq!(row[3], &CellValue::Text("26".to_string()));
    assert!(row[4].is_null(), "point has no text decoding");
}

#[tokio::test]
async fn test_invalid_query_is_query_error() {
    let Some(warehouse) = connect().await else {
        return;
    };

    match warehouse
        .fetch("SELECT * FROM analytics.no_such_table", &[])
        .await
    {
        Err(LakehouseError::Database(DbError::QueryFailed(_))) => {}
        other => panic!("Expected query error, got {:?}", other.map(|_| ())),
    }

    // the pool is still usable afterwards
    let table = warehouse.fetch("SELECT 1 AS ok", &[]).await.unwrap();
    assert_eq!(table.row_count(), 1);
}

#[tokio::test]
async fn test_statement_timeout_applies() {
    let Some(warehouse) = connect().await else {
        return;
    };

    let result = warehouse.fetch("SELECT pg_sleep(10)", &[]).await;
    assert!(matches!(
        result,
        Err(LakehouseError::Database(DbError::QueryFailed(_)))
    ));
}

#[tokio::test]
async fn test_provider_reuses_one_pool() {
    let Some(warehouse) = connect().await else {
        return;
    };

    let provider = warehouse.provider();
    let first = provider.get_connection().await.unwrap();
    for _ in 0..5 {
        warehouse.fetch("SELECT 1", &[]).await.unwrap();
    }
    let second = provider.get_connection().await.unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(second.status().size <= 2);
}
