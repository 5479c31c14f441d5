//! Read-through query cache
//!
//! Results are cached per [`QuerySpec`] (operation plus parameters) for a
//! fixed time-to-live per operation. Expiry is lazy: a stale entry stays in
//! the map until the next access for the same query replaces it, or until
//! [`QueryCache::purge_expired`] (or the optional reaper task) drops it.
//!
//! A failed recompute stores nothing, so the previous entry stays in place.
//! Two callers missing the same query at once may both recompute; the last
//! write wins.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::db::types::Table;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

/// The fixed read operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Summary,
    RawSample,
}

/// Cache key: an operation and its parameter values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySpec {
    Summary,
    RawSample { limit: u32 },
}

impl QuerySpec {
    pub fn operation(&self) -> Operation {
        match self {
            QuerySpec::Summary => Operation::Summary,
            QuerySpec::RawSample { .. } => Operation::RawSample,
        }
    }
}

/// Time-to-live per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub summary: Duration,
    pub raw_sample: Duration,
}

impl CacheTtl {
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            summary: ttl,
            raw_sample: ttl,
        }
    }

    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Summary => self.summary,
            Operation::RawSample => self.raw_sample,
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(300))
    }
}

/// A computed result and when it was computed.
///
/// Entries are shared behind `Arc` and never mutated; recomputation
/// replaces the whole entry.
#[derive(Debug, PartialEq)]
pub struct CacheEntry {
    spec: QuerySpec,
    value: Table,
    computed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn table(&self) -> &Table {
        &self.value
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    /// Whether this entry is still fresh at `now`.
    ///
    /// An entry computed after `now` means the clock went backwards; its age
    /// is unknown, so it counts as expired.
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match now.signed_duration_since(self.computed_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => false,
        }
    }
}

/// Read-through cache of query results
pub struct QueryCache {
    entries: RwLock<HashMap<QuerySpec, Arc<CacheEntry>>>,
    ttl: CacheTtl,
    clock: Arc<dyn Clock>,
}

impl QueryCache {
    pub fn new(ttl: CacheTtl) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: CacheTtl, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Return the fresh entry for `spec`, or run `compute` and store its result.
    ///
    /// # Errors
    /// Returns whatever `compute` fails with; nothing is stored in that case
    pub async fn get<F, Fut>(&self, spec: QuerySpec, compute: F) -> Result<Arc<CacheEntry>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Table>>,
    {
        let ttl = self.ttl.for_operation(spec.operation());
        if let Some(entry) = self.peek(&spec) {
            if entry.is_fresh(self.clock.now(), ttl) {
                tracing::debug!(?spec, "cache hit");
                return Ok(entry);
            }
            tracing::debug!(?spec, computed_at = %entry.computed_at, "cache entry expired");
        } else {
            tracing::debug!(?spec, "cache miss");
        }

        let value = compute().await?;
        let entry = Arc::new(CacheEntry {
            spec: spec.clone(),
            value,
            computed_at: self.clock.now(),
        });
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(spec, Arc::clone(&entry));
        Ok(entry)
    }

    /// The stored entry for `spec`, fresh or not
    pub fn peek(&self, spec: &QuerySpec) -> Option<Arc<CacheEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(spec)
            .cloned()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|spec, entry| entry.is_fresh(now, self.ttl.for_operation(spec.operation())));
        before - entries.len()
    }

    /// Sweep expired entries every `period` until the cache is dropped
    pub fn spawn_reaper(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else { break };
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "reaped expired cache entries");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
