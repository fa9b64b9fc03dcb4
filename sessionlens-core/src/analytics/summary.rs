//! Global summary statistics and their memoizing facade.
//!
//! The summary bundle is shown by several display surfaces, so it is
//! computed once per cache generation and shared. A generation ends only when
//! a caller invalidates it.

use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::db::Database;
use crate::error::{Error, Result};

/// Whole-table summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_sessions: i64,
    pub unique_users: i64,
    pub total_conversions: i64,
    /// Percent of sessions converted; 0 for an empty table
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub avg_revenue_per_session: f64,
    pub avg_page_views: f64,
    pub avg_time_on_page: f64,
}

type Generation = Arc<OnceCell<Arc<SummaryStats>>>;

/// Memoizing facade over [`Database::get_summary_stats`].
pub struct SummaryCache {
    db: Arc<Database>,
    generation: RwLock<Generation>,
}

impl SummaryCache {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            generation: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// The store this cache reads from.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    fn current(&self) -> Generation {
        self.generation
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Get the summary, computing it if this generation has none yet.
    ///
    /// Concurrent callers on an empty generation block on a single
    /// computation and share its result. Failures are not cached; they are
    /// reported as [`Error::SummaryUnavailable`] so the next call retries.
    pub fn get(&self) -> Result<Arc<SummaryStats>> {
        let cell = self.current();
        cell.get_or_try_init(|| {
            tracing::debug!("Computing summary statistics");
            self.db.get_summary_stats().map(Arc::new)
        })
        .map(Arc::clone)
        .map_err(|e| {
            tracing::warn!(error = %e, "Summary statistics unavailable");
            Error::SummaryUnavailable(e.to_string())
        })
    }

    /// Whether the current generation already holds a summary.
    pub fn is_cached(&self) -> bool {
        self.current().get().is_some()
    }

    /// Drop the cached summary; the next [`get`](Self::get) recomputes it.
    pub fn invalidate(&self) {
        let mut generation = self
            .generation
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *generation = Arc::new(OnceCell::new());
        tracing::debug!("Summary cache invalidated");
    }
}
