//! Common test utilities and helpers
//!
//! A scripted in-memory warehouse serving the two dashboard statements, plus
//! fixtures shaped like what PostgreSQL hands back before sanitizing.

#![allow(dead_code)]

use lakehouse_lite::db::types::{CellValue, Column, DataType, Table};
use lakehouse_lite::db::{SqlParam, Warehouse};
use lakehouse_lite::error::{DbError, Result};
use lakehouse_lite::queries::{RAW_SAMPLE_SQL, SUMMARY_SQL};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

/// NUMERIC columns arrive as decimal text
pub fn numeric(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn summary_row(
    species: Option<&str>,
    sex: Option<&str>,
    count: i64,
    mass: &str,
    flipper: &str,
) -> Vec<CellValue> {
    vec![
        species.map_or(CellValue::Null, text),
        sex.map_or(CellValue::Null, text),
        CellValue::Integer(count),
        numeric(mass),
        numeric(flipper),
    ]
}

/// The three known groups plus rows the species policy must drop
pub fn raw_summary() -> Table {
    Table::from_rows(
        vec![
            ("species".to_string(), DataType::Varchar(None)),
            ("sex".to_string(), DataType::Varchar(None)),
            ("penguin_count".to_string(), DataType::BigInt),
            ("avg_body_mass_g".to_string(), DataType::Numeric),
            ("avg_flipper_length_mm".to_string(), DataType::Numeric),
        ],
        vec![
            summary_row(Some("Adelie"), Some("female"), 73, "3368.8", "187.8"),
            summary_row(Some("Adelie"), Some("male"), 73, "4043.5", "192.4"),
            summary_row(Some("Emperor"), Some("male"), 12, "22000.0", "350.0"),
            summary_row(Some("Gentoo"), Some("female"), 58, "4679.7", "212.7"),
            summary_row(None, None, 9, "NaN", "NaN"),
        ],
    )
    .unwrap()
}

/// Staging rows in the statement's sort order, with the usual dirt
pub fn raw_penguins() -> Table {
    let row = |species: &str, island: &str, bill: CellValue, mass: i32, sex: CellValue| {
        vec![
            text(species),
            text(island),
            bill,
            CellValue::Float(18.0),
            CellValue::Integer(190),
            CellValue::Integer(i64::from(mass)),
            sex,
        ]
    };
    Table::from_rows(
        vec![
            ("species".to_string(), DataType::Text),
            ("island".to_string(), DataType::Text),
            ("bill_length_mm".to_string(), DataType::Double),
            ("bill_depth_mm".to_string(), DataType::Real),
            ("flipper_length_mm".to_string(), DataType::Integer),
            ("body_mass_g".to_string(), DataType::Integer),
            ("sex".to_string(), DataType::Text),
        ],
        vec![
            row("Adelie", "Biscoe", CellValue::Float(35.0), 3400, text("female")),
            row("Adelie", "Dream", CellValue::Float(f64::NAN), 3700, text("NaN")),
            row("Adelie", "Torgersen", CellValue::Float(39.1), 3750, text("male")),
            row("Chinstrap", "Dream", CellValue::Float(46.5), 3500, CellValue::Null),
            row("Emperor", "Ross", CellValue::Float(80.0), 23000, text("male")),
            row("Gentoo", "Biscoe", CellValue::Float(46.1), 4500, text("<NA>")),
            row("Gentoo", "Biscoe", CellValue::Float(50.0), 5700, text("male")),
        ],
    )
    .unwrap()
}

/// One recorded `fetch` call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// In-memory warehouse answering the dashboard statements
pub struct FakeWarehouse {
    summary: Mutex<Table>,
    penguins: Table,
    failing: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::with_tables(raw_summary(), raw_penguins())
    }

    pub fn with_tables(summary: Table, penguins: Table) -> Self {
        Self {
            summary: Mutex::new(summary),
            penguins,
            failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every following fetch fail like a dropped relation
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Replace what the summary statement returns
    pub fn set_summary(&self, summary: Table) {
        *self.summary.lock().unwrap() = summary;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, sql: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.sql == sql).count()
    }
}

impl Default for FakeWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Warehouse for FakeWarehouse {
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<Table> {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(DbError::QueryFailed(
                "relation \"analytics.mart_penguin_summary\" does not exist".to_string(),
            )
            .into());
        }

        if sql == SUMMARY_SQL {
            return Ok(self.summary.lock().unwrap().clone());
        }
        if sql == RAW_SAMPLE_SQL {
            let limit = match params {
                [SqlParam::Int(n)] => usize::try_from(*n).unwrap_or(0),
                other => {
                    return Err(DbError::QueryFailed(format!("bad parameters {:?}", other)).into());
                }
            };
            return Ok(self.penguins.select_rows(|i| i < limit));
        }
        Err(DbError::QueryFailed(format!("unexpected statement: {}", sql)).into())
    }
}

/// A species/count summary, for replacing what the warehouse returns
pub fn counts_summary(rows: &[(&str, i64)]) -> Table {
    Table::new(vec![
        Column::new(
            "species",
            DataType::Text,
            rows.iter().map(|(s, _)| text(s)).collect(),
        ),
        Column::new(
            "penguin_count",
            DataType::BigInt,
            rows.iter().map(|(_, n)| CellValue::Integer(*n)).collect(),
        ),
    ])
    .unwrap()
}
