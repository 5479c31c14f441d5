//! Table serialization (text / CSV / JSON)
//!
//! Pure serialization functions, no I/O. The caller prints or writes the
//! returned string.

use crate::db::types::{CellValue, Table, hex_encode};
use unicode_width::UnicodeWidthStr;

/// Widest a text column is allowed to get
const MAX_TEXT_WIDTH: usize = 40;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn render(&self, table: &Table) -> String {
        match self {
            ExportFormat::Text => to_text(table),
            ExportFormat::Csv => to_csv(table),
            ExportFormat::Json => to_json(table),
        }
    }
}

/// Render an aligned plain-text table followed by a row count.
///
/// Column widths use display width, so wide (CJK) characters line up.
pub fn to_text(table: &Table) -> String {
    let cells: Vec<Vec<String>> = table
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| cell.display_string(MAX_TEXT_WIDTH))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = table.columns().iter().map(|c| c.name.width()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let mut out = String::new();
    let header: Vec<&str> = table.column_names();
    push_text_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_text_line(&mut out, &rule, &widths);
    for row in &cells {
        push_text_line(&mut out, row, &widths);
    }

    let n = table.row_count();
    out.push_str(&format!("({} row{})\n", n, if n == 1 { "" } else { "s" }));
    out
}

fn push_text_line<S: AsRef<str>>(out: &mut String, fields: &[S], widths: &[usize]) {
    let mut line = String::new();
    for (i, (field, width)) in fields.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let field = field.as_ref();
        line.push_str(field);
        line.push_str(&" ".repeat(width.saturating_sub(field.width())));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Serialize a table as RFC 4180 CSV.
pub fn to_csv(table: &Table) -> String {
    let mut out = String::new();

    for (i, name) in table.column_names().into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        csv_escape_into(&mut out, name);
    }
    out.push('\n');

    for row in table.rows() {
        for (i, cell) in row.into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            csv_escape_into(&mut out, &cell_to_export_string(cell));
        }
        out.push('\n');
    }

    out
}

/// Serialize a table as a JSON array of objects with typed values.
pub fn to_json(table: &Table) -> String {
    let names = table.column_names();
    let rows: Vec<serde_json::Value> = table
        .rows()
        .map(|row| {
            let obj: serde_json::Map<String, serde_json::Value> = names
                .iter()
                .zip(row)
                .map(|(name, cell)| (name.to_string(), cell_to_json(cell)))
                .collect();
            serde_json::Value::Object(obj)
        })
        .collect();

    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Untruncated value for CSV (NULL → empty string)
fn cell_to_export_string(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        other => other.full_string(),
    }
}

fn cell_to_json(cell: &CellValue) -> serde_json::Value {
    match cell {
        CellValue::Null => serde_json::Value::Null,
        CellValue::Integer(i) => serde_json::json!(*i),
        CellValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            // NaN / Infinity aren't valid JSON numbers
            .unwrap_or(serde_json::Value::Null),
        CellValue::Text(s) | CellValue::DateTime(s) | CellValue::Uuid(s) => {
            serde_json::Value::String(s.clone())
        }
        CellValue::Boolean(b) => serde_json::Value::Bool(*b),
        CellValue::Json(v) => v.clone(),
        CellValue::Binary(b) => serde_json::Value::String(hex_encode(b)),
        CellValue::Array(arr) => serde_json::Value::Array(arr.iter().map(cell_to_json).collect()),
    }
}

/// Quote a field if it contains `,` `"` or a line break (RFC 4180).
fn csv_escape_into(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
