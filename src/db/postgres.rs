//! PostgreSQL warehouse
//!
//! Runs the fixed read statements over a pooled client and converts the
//! returned rows into a columnar [`Table`].

use crate::db::pool::ConnectionProvider;
use crate::db::types::{CellValue, DataType, Table};
use crate::db::warehouse::{SqlParam, Warehouse};
use crate::error::{DbError, Result};
use rust_decimal::Decimal;
use std::error::Error;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_postgres::types::{FromSql, Kind, ToSql, Type};

type DecodeResult<T> = std::result::Result<T, Box<dyn Error + Sync + Send>>;

/// Warehouse backed by the shared connection pool
#[derive(Clone)]
pub struct PostgresWarehouse {
    provider: Arc<ConnectionProvider>,
}

impl PostgresWarehouse {
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }
}

impl Warehouse for PostgresWarehouse {
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<Table> {
        let start = std::time::Instant::now();
        let client = self.provider.checkout().await?;

        let query_failed = |e: tokio_postgres::Error| {
            tracing::warn!(error = %e, "warehouse query failed");
            DbError::QueryFailed(e.to_string())
        };

        let stmt = client.prepare_cached(sql).await.map_err(query_failed)?;

        let definitions: Vec<(String, DataType)> = stmt
            .columns()
            .iter()
            .map(|col| (col.name().to_string(), pg_type_to_datatype(col.type_())))
            .collect();

        let bound: Vec<&(dyn ToSql + Sync)> = params.iter().map(SqlParam::as_sql).collect();
        let pg_rows = client.query(&stmt, &bound).await.map_err(query_failed)?;

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let values = definitions
                .iter()
                .enumerate()
                .map(|(i, (_, data_type))| extract_cell_value(pg_row, i, data_type))
                .collect();
            rows.push(values);
        }

        let table = Table::from_rows(definitions, rows)?;
        tracing::debug!(
            rows = table.row_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "warehouse query finished"
        );
        Ok(table)
    }
}

/// Map a postgres column type to our DataType, recursing into arrays
fn pg_type_to_datatype(pg_type: &Type) -> DataType {
    if let Kind::Array(inner) = pg_type.kind() {
        return DataType::Array(Box::new(pg_type_to_datatype(inner)));
    }
    match *pg_type {
        Type::INT2 => DataType::SmallInt,
        Type::INT4 => DataType::Integer,
        Type::INT8 => DataType::BigInt,
        Type::FLOAT4 => DataType::Real,
        Type::FLOAT8 => DataType::Double,
        Type::NUMERIC => DataType::Numeric,
        Type::TEXT | Type::NAME => DataType::Text,
        Type::VARCHAR => DataType::Varchar(None),
        Type::CHAR | Type::BPCHAR => DataType::Char(None),
        Type::BOOL => DataType::Boolean,
        Type::DATE => DataType::Date,
        Type::TIME => DataType::Time,
        Type::TIMESTAMP => DataType::Timestamp,
        Type::TIMESTAMPTZ => DataType::TimestampTz,
        Type::INTERVAL => DataType::Interval,
        Type::JSON => DataType::Json,
        Type::JSONB => DataType::Jsonb,
        Type::BYTEA => DataType::Bytea,
        Type::UUID => DataType::Uuid,
        _ => DataType::Unknown(pg_type.name().to_string()),
    }
}

/// Read column `idx` as `Option<T>` and wrap a non-null value.
///
/// `None` means the column isn't readable as `T`.
fn read<T>(
    row: &tokio_postgres::Row,
    idx: usize,
    wrap: impl FnOnce(T) -> CellValue,
) -> Option<CellValue>
where
    T: for<'a> FromSql<'a>,
{
    match row.try_get::<_, Option<T>>(idx) {
        Ok(Some(v)) => Some(wrap(v)),
        Ok(None) => Some(CellValue::Null),
        Err(_) => None,
    }
}

/// Read an array column as `Vec<T>`, wrapping each element
fn read_array<T>(
    row: &tokio_postgres::Row,
    idx: usize,
    wrap: impl Fn(T) -> CellValue,
) -> Option<CellValue>
where
    T: for<'a> FromSql<'a>,
{
    read::<Vec<T>>(row, idx, |items| {
        CellValue::Array(items.into_iter().map(wrap).collect())
    })
}

/// Extract a cell value from a row based on the column's DataType.
///
/// NUMERIC arrives as decimal text; the sanitizer parses it later. When no
/// typed read works the cell is decoded by [`WireText`], and a cell of a
/// type it doesn't know becomes NULL.
fn extract_cell_value(row: &tokio_postgres::Row, idx: usize, data_type: &DataType) -> CellValue {
    let typed = match data_type {
        DataType::SmallInt => read(row, idx, |v: i16| CellValue::Integer(v.into())),
        DataType::Integer => read(row, idx, |v: i32| CellValue::Integer(v.into())),
        DataType::BigInt => read(row, idx, CellValue::Integer),
        DataType::Real => read(row, idx, |v: f32| CellValue::Float(v.into())),
        DataType::Double => read(row, idx, CellValue::Float),
        DataType::Numeric => read(row, idx, |v: Decimal| CellValue::Text(v.to_string())),
        DataType::Boolean => read(row, idx, CellValue::Boolean),
        DataType::Json | DataType::Jsonb => read(row, idx, CellValue::Json),
        DataType::Bytea => read(row, idx, CellValue::Binary),
        DataType::Uuid => read(row, idx, |v: uuid::Uuid| CellValue::Uuid(v.to_string())),
        DataType::Timestamp => read(row, idx, |v: chrono::NaiveDateTime| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::TimestampTz => read(row, idx, |v: chrono::DateTime<chrono::Utc>| {
            CellValue::DateTime(v.to_rfc3339())
        }),
        DataType::Date => read(row, idx, |v: chrono::NaiveDate| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::Time => read(row, idx, |v: chrono::NaiveTime| {
            CellValue::DateTime(v.to_string())
        }),
        DataType::Array(inner) => extract_array_value(row, idx, inner),
        _ => None,
    };

    typed.unwrap_or_else(|| match row.try_get::<_, Option<WireText>>(idx) {
        Ok(Some(WireText(v))) => CellValue::Text(v),
        Ok(None) => CellValue::Null,
        Err(e) => {
            tracing::debug!(
                column = row.columns().get(idx).map_or("?", |c| c.name()),
                pg_type = row.columns().get(idx).map_or("unknown", |c| c.type_().name()),
                error = %e,
                "unreadable cell replaced with NULL"
            );
            CellValue::Null
        }
    })
}

/// Text form of a value decoded from its binary wire representation.
///
/// Covers the text-like types, enum labels, `interval`, `inet`, `cidr` and
/// `oid`. Other types fail to decode.
struct WireText(String);

impl<'a> FromSql<'a> for WireText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> DecodeResult<Self> {
        if <String as FromSql>::accepts(ty) {
            return String::from_sql(ty, raw).map(WireText);
        }
        let text = match *ty {
            Type::INTERVAL => interval_text(raw)?,
            Type::INET | Type::CIDR => inet_text(raw)?,
            Type::OID => u32::from_sql(ty, raw)?.to_string(),
            // enum values travel as their label
            _ if matches!(ty.kind(), Kind::Enum(_)) => std::str::from_utf8(raw)?.to_string(),
            _ => return Err(format!("no text form for type {}", ty.name()).into()),
        };
        Ok(WireText(text))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// `interval` is microseconds (i64), days (i32) and months (i32)
fn interval_text(raw: &[u8]) -> DecodeResult<String> {
    if raw.len() != 16 {
        return Err(format!("interval is 16 bytes, got {}", raw.len()).into());
    }
    let micros = i64::from_be_bytes(raw[..8].try_into()?);
    let days = i32::from_be_bytes(raw[8..12].try_into()?);
    let months = i32::from_be_bytes(raw[12..].try_into()?);

    let mut parts = Vec::new();
    for (n, unit) in [(months / 12, "year"), (months % 12, "mon"), (days, "day")] {
        if n != 0 {
            let plural = if n == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", n, unit, plural));
        }
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let secs = total / 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let frac = total % 1_000_000;
        if frac != 0 {
            let digits = format!("{:06}", frac);
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }
    Ok(parts.join(" "))
}

/// `inet`/`cidr` is family, prefix bits, cidr flag, address length, address
fn inet_text(raw: &[u8]) -> DecodeResult<String> {
    let [family, bits, is_cidr, len, addr @ ..] = raw else {
        return Err("truncated inet value".into());
    };
    if addr.len() != usize::from(*len) {
        return Err("inet address length mismatch".into());
    }
    let (ip, max_bits) = match (family, addr.len()) {
        (2, 4) => (IpAddr::from(<[u8; 4]>::try_from(addr)?), 32),
        (3, 16) => (IpAddr::from(<[u8; 16]>::try_from(addr)?), 128),
        _ => return Err(format!("unsupported inet family {}", family).into()),
    };
    if *is_cidr != 0 || *bits != max_bits {
        Ok(format!("{}/{}", ip, bits))
    } else {
        Ok(ip.to_string())
    }
}

fn extract_array_value(
    row: &tokio_postgres::Row,
    idx: usize,
    inner: &DataType,
) -> Option<CellValue> {
    match inner {
        DataType::Text | DataType::Varchar(_) | DataType::Char(_) => {
            read_array(row, idx, CellValue::Text)
        }
        DataType::SmallInt => read_array(row, idx, |n: i16| CellValue::Integer(n.into())),
        DataType::Integer => read_array(row, idx, |n: i32| CellValue::Integer(n.into())),
        DataType::BigInt => read_array(row, idx, CellValue::Integer),
        DataType::Real => read_array(row, idx, |n: f32| CellValue::Float(n.into())),
        DataType::Double => read_array(row, idx, CellValue::Float),
        DataType::Numeric => read_array(row, idx, |d: Decimal| CellValue::Text(d.to_string())),
        DataType::Boolean => read_array(row, idx, CellValue::Boolean),
        DataType::Uuid => read_array(row, idx, |u: uuid::Uuid| CellValue::Uuid(u.to_string())),
        DataType::Json | DataType::Jsonb => read_array(row, idx, CellValue::Json),
        _ => None,
    }
}
