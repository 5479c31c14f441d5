//! Result sanitizer
//!
//! Rewrites a [`Table`] so every cell is one of the primitive values a
//! generic renderer can show: text, integer, finite float, boolean or null.
//! Each column is coerced according to its declared type's [`ColumnKind`]
//! and re-declared with the kind's canonical type, so sanitizing an already
//! sanitized table changes nothing.
//!
//! Values that can't be coerced become null. Dashboard data is for display,
//! and a blank cell beats a failed section.

use crate::db::types::{CellValue, Column, ColumnKind, Table};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};

/// Species present in the source dataset
pub const KNOWN_SPECIES: [&str; 3] = ["Adelie", "Chinstrap", "Gentoo"];

/// Name of the column the species policy applies to
pub const SPECIES_COLUMN: &str = "species";

/// Text values treated as missing
const NULL_MARKERS: [&str; 4] = ["NaN", "nan", "<NA>", "NaT"];

/// What to do with rows whose species isn't in [`KNOWN_SPECIES`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesPolicy {
    /// Keep every row
    #[default]
    PassThrough,
    /// Drop rows whose species is null or unknown
    KnownOnly,
}

/// Coerce every column to a renderer-safe type, keeping all rows
pub fn sanitize(table: &Table) -> Table {
    sanitize_with(table, SpeciesPolicy::PassThrough)
}

/// Coerce every column, then apply the species policy
pub fn sanitize_with(table: &Table, policy: SpeciesPolicy) -> Table {
    let columns: Vec<Column> = table.columns().iter().map(sanitize_column).collect();
    // Coercion maps values one-to-one, so lengths still match
    let coerced = match Table::new(columns) {
        Ok(t) => t,
        Err(_) => return Table::default(),
    };

    match policy {
        SpeciesPolicy::PassThrough => coerced,
        SpeciesPolicy::KnownOnly => filter_known_species(&coerced),
    }
}

/// True if `value` is a known species name
pub fn is_known_species(value: &CellValue) -> bool {
    value
        .as_str()
        .is_some_and(|s| KNOWN_SPECIES.contains(&s))
}

fn filter_known_species(table: &Table) -> Table {
    let Some(species) = table.column(SPECIES_COLUMN) else {
        return table.clone();
    };
    table.select_rows(|i| is_known_species(&species.values[i]))
}

fn sanitize_column(column: &Column) -> Column {
    let kind = column.data_type.kind();
    Column {
        name: column.name.clone(),
        data_type: kind.canonical_type(),
        values: column
            .values
            .iter()
            .map(|v| coerce(v, kind).unwrap_or(CellValue::Null))
            .collect(),
    }
}

/// Coerce one value to `kind`
pub fn coerce(value: &CellValue, kind: ColumnKind) -> DbResult<CellValue> {
    if value.is_null() {
        return Ok(CellValue::Null);
    }
    match kind {
        ColumnKind::Text => Ok(to_text(value)),
        ColumnKind::Integer => to_integer(value),
        ColumnKind::Float => to_float(value),
        ColumnKind::Boolean => to_boolean(value),
    }
}

/// The marker check runs on the rendered text, so a marker reaching the
/// column through any variant is nulled on the first pass
fn to_text(value: &CellValue) -> CellValue {
    let rendered = match value {
        CellValue::Float(f) if !f.is_finite() => return CellValue::Null,
        CellValue::Json(serde_json::Value::Null) => return CellValue::Null,
        CellValue::Json(serde_json::Value::String(s)) => s.clone(),
        other => other.full_string(),
    };
    if is_null_marker(&rendered) {
        CellValue::Null
    } else {
        CellValue::Text(rendered)
    }
}

fn to_integer(value: &CellValue) -> DbResult<CellValue> {
    match value {
        CellValue::Integer(i) => Ok(CellValue::Integer(*i)),
        CellValue::Boolean(b) => Ok(CellValue::Integer(i64::from(*b))),
        CellValue::Float(f) => integral(*f),
        CellValue::Text(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Ok(CellValue::Integer(i)),
                Err(_) => s
                    .parse::<f64>()
                    .map_err(|_| unparsable(s, "integer"))
                    .and_then(integral),
            }
        }
        CellValue::Json(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(CellValue::Integer)
            .ok_or_else(|| unparsable(&n.to_string(), "integer")),
        other => Err(unparsable(&other.full_string(), "integer")),
    }
}

/// Whole-valued finite floats become integers
fn integral(f: f64) -> DbResult<CellValue> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(CellValue::Integer(f as i64))
    } else {
        Err(unparsable(&f.to_string(), "integer"))
    }
}

fn to_float(value: &CellValue) -> DbResult<CellValue> {
    let f = match value {
        CellValue::Float(f) => *f,
        CellValue::Integer(i) => *i as f64,
        CellValue::Boolean(b) => f64::from(u8::from(*b)),
        CellValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| unparsable(s, "float"))?,
        CellValue::Json(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| unparsable(&n.to_string(), "float"))?,
        other => return Err(unparsable(&other.full_string(), "float")),
    };
    if f.is_finite() {
        Ok(CellValue::Float(f))
    } else {
        Err(unparsable(&f.to_string(), "float"))
    }
}

fn to_boolean(value: &CellValue) -> DbResult<CellValue> {
    match value {
        CellValue::Boolean(b) => Ok(CellValue::Boolean(*b)),
        CellValue::Integer(0) => Ok(CellValue::Boolean(false)),
        CellValue::Integer(1) => Ok(CellValue::Boolean(true)),
        CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(CellValue::Boolean(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(CellValue::Boolean(false)),
            _ => Err(unparsable(s, "boolean")),
        },
        CellValue::Json(serde_json::Value::Bool(b)) => Ok(CellValue::Boolean(*b)),
        other => Err(unparsable(&other.full_string(), "boolean")),
    }
}

fn is_null_marker(s: &str) -> bool {
    NULL_MARKERS.contains(&s.trim())
}

fn unparsable(raw: &str, target: &str) -> DbError {
    DbError::TypeConversion(format!("cannot read {:?} as {}", raw, target))
}
