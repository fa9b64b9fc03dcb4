//! # sessionlens-core
//!
//! Core library for sessionlens - engagement, conversion and revenue
//! analytics over a table of user sessions.
//!
//! This library provides:
//! - An event store backed by SQLite (in-memory or on-disk)
//! - Aggregation pipelines producing small, ordered summary tables
//! - A memoized global summary for display surfaces
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Lifecycle
//!
//! The store is created empty, bulk-loaded once, then only read:
//! open → `create_schema` → `load_csv` → any number of pipeline calls.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sessionlens_core::{Database, Granularity};
//!
//! let db = Database::open_in_memory().expect("failed to open database");
//! db.create_schema().expect("failed to create schema");
//! db.load_csv(Path::new("user_events.csv")).expect("failed to load events");
//!
//! let funnel = db.get_conversion_funnel().expect("funnel query failed");
//! let weekly = db
//!     .get_timeseries_conversion(Granularity::Week)
//!     .expect("time series query failed");
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{
    CategoryRow, CohortRow, EngagementSegment, EngagementSegmentRow, EngagementThresholds,
    FunnelStage, FunnelStageRow, Granularity, SummaryCache, SummaryStats, TimeseriesBucket,
    UserType, UserTypeRow,
};
pub use config::Config;
pub use db::{Database, LoadOptions, QueryResult};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
