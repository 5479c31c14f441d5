//! The dashboard's fixed read operations
//!
//! Each operation runs one read-only statement against the mart/staging
//! tables built by the transform job, sanitizes the result and caches it.
//! Parameters are always bound, never formatted into the statement.

use crate::cache::{CacheEntry, QueryCache, QuerySpec};
use crate::db::types::{CellValue, DataType, Table};
use crate::db::warehouse::{SqlParam, Warehouse};
use crate::error::Result;
use crate::sanitize::{SPECIES_COLUMN, SpeciesPolicy, sanitize_with};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// One row per (species, sex) group
pub const SUMMARY_SQL: &str = "\
SELECT species, sex, penguin_count, avg_body_mass_g, avg_flipper_length_mm \
FROM analytics.mart_penguin_summary \
ORDER BY species, sex NULLS LAST";

/// Individual records, ordered on every column so a limit always returns
/// a prefix of the same sequence
pub const RAW_SAMPLE_SQL: &str = "\
SELECT species, island, bill_length_mm, bill_depth_mm, flipper_length_mm, body_mass_g, sex \
FROM analytics.stg_penguins \
ORDER BY species NULLS LAST, island NULLS LAST, bill_length_mm NULLS LAST, \
bill_depth_mm NULLS LAST, flipper_length_mm NULLS LAST, body_mass_g NULLS LAST, sex NULLS LAST \
LIMIT $1";

/// Column of the summary holding each group's size
pub const COUNT_COLUMN: &str = "penguin_count";

/// Headline numbers, derived from the summary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total_groups: usize,
    pub total_entities: i64,
    pub distinct_categories: usize,
}

impl Metrics {
    /// Aggregate a sanitized summary table.
    ///
    /// Null counts add nothing; null species aren't a distinct species.
    /// The total saturates at `i64::MAX` instead of overflowing.
    pub fn from_summary(summary: &Table) -> Self {
        let total_entities = summary.column(COUNT_COLUMN).map_or(0, |c| {
            c.values
                .iter()
                .filter_map(CellValue::as_i64)
                .fold(0i64, i64::saturating_add)
        });
        let distinct_categories = summary.column(SPECIES_COLUMN).map_or(0, |c| {
            c.values
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<HashSet<_>>()
                .len()
        });
        Self {
            total_groups: summary.row_count(),
            total_entities,
            distinct_categories,
        }
    }

    /// The metrics as a one-row table, for the table exporters
    pub fn to_table(&self) -> Table {
        let count = |n: usize| CellValue::Integer(i64::try_from(n).unwrap_or(i64::MAX));
        Table::from_record(vec![
            ("total_groups".to_string(), DataType::BigInt, count(self.total_groups)),
            (
                "total_entities".to_string(),
                DataType::BigInt,
                CellValue::Integer(self.total_entities),
            ),
            (
                "distinct_categories".to_string(),
                DataType::BigInt,
                count(self.distinct_categories),
            ),
        ])
    }
}

/// Cached, sanitized access to the warehouse
pub struct Dashboard<W> {
    warehouse: W,
    cache: Arc<QueryCache>,
    raw_sample_policy: SpeciesPolicy,
}

impl<W: Warehouse> Dashboard<W> {
    /// The summary always drops unknown species; the raw sample follows
    /// `raw_sample_policy`.
    pub fn new(warehouse: W, cache: Arc<QueryCache>, raw_sample_policy: SpeciesPolicy) -> Self {
        Self {
            warehouse,
            cache,
            raw_sample_policy,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Per-group counts and averages, ordered by species then sex
    ///
    /// # Errors
    /// Connection and query failures; nothing is cached on failure
    pub async fn load_summary(&self) -> Result<Arc<CacheEntry>> {
        self.cache
            .get(QuerySpec::Summary, || async {
                let table = self.warehouse.fetch(SUMMARY_SQL, &[]).await?;
                Ok(sanitize_with(&table, SpeciesPolicy::KnownOnly))
            })
            .await
    }

    /// Totals over the current summary.
    ///
    /// Derived from the cached summary table, so they always agree with
    /// what [`load_summary`](Self::load_summary) returns.
    ///
    /// # Errors
    /// Same as `load_summary`
    pub async fn load_metrics(&self) -> Result<Metrics> {
        let summary = self.load_summary().await?;
        Ok(Metrics::from_summary(summary.table()))
    }

    /// Up to `limit` raw records in a stable order
    ///
    /// # Errors
    /// Connection and query failures; nothing is cached on failure
    pub async fn load_raw_sample(&self, limit: u32) -> Result<Arc<CacheEntry>> {
        let policy = self.raw_sample_policy;
        self.cache
            .get(QuerySpec::RawSample { limit }, || async move {
                let params = [SqlParam::Int(i64::from(limit))];
                let table = self.warehouse.fetch(RAW_SAMPLE_SQL, &params).await?;
                Ok(sanitize_with(&table, policy))
            })
            .await
    }
}
