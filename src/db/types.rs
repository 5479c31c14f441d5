//! Database type definitions
//!
//! Core data structures for representing query results: data types, cell
//! values, and the columnar [`Table`] handed to the renderer.

use crate::error::{DbError, DbResult};

/// Database data types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,
    Numeric,

    // Text types
    Text,
    Varchar(Option<usize>),
    Char(Option<usize>),

    // Boolean
    Boolean,

    // Date/time types
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,

    // JSON types
    Json,
    Jsonb,

    // Binary data
    Bytea,

    // UUID
    Uuid,

    // Array type
    Array(Box<DataType>),

    // Other/unknown types
    Unknown(String),
}

/// The primitive kinds a generic renderer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Boolean,
}

/// A cell value (single column value in a row)
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text/string value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// JSON value (parsed)
    Json(serde_json::Value),

    /// Binary data
    Binary(Vec<u8>),

    /// Date/time value (stored as string)
    DateTime(String),

    /// UUID value
    Uuid(String),

    /// Array value
    Array(Vec<CellValue>),
}

/// A named column of values sharing one declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type
    pub data_type: DataType,
    /// Values in row order
    pub values: Vec<CellValue>,
}

/// Ordered columns of equal length
///
/// Fields are private so the equal-length invariant can't be broken after
/// construction. Tables handed out by the cache are shared and immutable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl DataType {
    /// Which renderer-safe kind values of this type are coerced to.
    ///
    /// Anything a renderer can't introspect (json, uuid, bytea, dates,
    /// arrays, unknown types) is shown as text.
    pub fn kind(&self) -> ColumnKind {
        match self {
            DataType::SmallInt | DataType::Integer | DataType::BigInt => ColumnKind::Integer,
            DataType::Real | DataType::Double | DataType::Numeric => ColumnKind::Float,
            DataType::Boolean => ColumnKind::Boolean,
            _ => ColumnKind::Text,
        }
    }
}

impl ColumnKind {
    /// The declared type of a sanitized column of this kind
    pub fn canonical_type(self) -> DataType {
        match self {
            ColumnKind::Text => DataType::Text,
            ColumnKind::Integer => DataType::BigInt,
            ColumnKind::Float => DataType::Double,
            ColumnKind::Boolean => DataType::Boolean,
        }
    }
}

impl CellValue {
    /// Get a display string for this cell value (truncated if needed)
    pub fn display_string(&self, max_len: usize) -> String {
        let full = self.full_string();
        if full.chars().count() > max_len {
            let kept: String = full.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            full
        }
    }

    /// Untruncated value string (NULL → "NULL")
    pub fn full_string(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Json(v) => v.to_string(),
            CellValue::Binary(b) => hex_encode(b),
            CellValue::DateTime(s) => s.clone(),
            CellValue::Uuid(s) => s.clone(),
            CellValue::Array(arr) => {
                let items: Vec<String> = arr.iter().map(CellValue::full_string).collect();
                format!("{{{}}}", items.join(","))
            }
        }
    }

    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// True for the scalar variants a generic renderer can display as-is
    pub fn is_primitive(&self) -> bool {
        match self {
            CellValue::Null | CellValue::Integer(_) | CellValue::Text(_) | CellValue::Boolean(_) => {
                true
            }
            CellValue::Float(f) => f.is_finite(),
            _ => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            data_type,
            values,
        }
    }
}

impl Table {
    /// Build a table from columns, rejecting columns of unequal length
    pub fn new(columns: Vec<Column>) -> DbResult<Self> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        if let Some(bad) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(DbError::MalformedTable(format!(
                "column '{}' has {} values, expected {}",
                bad.name,
                bad.values.len(),
                row_count
            )));
        }
        Ok(Self { columns, row_count })
    }

    /// Build a table from column definitions and row-major values
    pub fn from_rows(
        definitions: Vec<(String, DataType)>,
        rows: Vec<Vec<CellValue>>,
    ) -> DbResult<Self> {
        let width = definitions.len();
        let mut columns: Vec<Column> = definitions
            .into_iter()
            .map(|(name, data_type)| Column::new(name, data_type, Vec::with_capacity(rows.len())))
            .collect();

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(DbError::MalformedTable(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Self::new(columns)
    }

    /// A one-row table with one column per field
    pub fn from_record(fields: Vec<(String, DataType, CellValue)>) -> Self {
        let columns: Vec<Column> = fields
            .into_iter()
            .map(|(name, data_type, value)| Column::new(name, data_type, vec![value]))
            .collect();
        let row_count = usize::from(!columns.is_empty());
        Self { columns, row_count }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Values of row `index` in column order
    pub fn row(&self, index: usize) -> Option<Vec<&CellValue>> {
        if index >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Iterate rows in order
    pub fn rows(&self) -> impl Iterator<Item = Vec<&CellValue>> + '_ {
        (0..self.row_count).filter_map(move |i| self.row(i))
    }

    /// Keep only the rows whose index satisfies `keep`
    pub fn select_rows(&self, keep: impl Fn(usize) -> bool) -> Table {
        let indices: Vec<usize> = (0..self.row_count).filter(|i| keep(*i)).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data_type: c.data_type.clone(),
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Table {
            columns,
            row_count: indices.len(),
        }
    }
}

/// Hex-encode binary data (e.g. `\xdeadbeef`).
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("\\x");
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}
