//! Analytics module for sessionlens
//!
//! Row types and classification rules for the aggregation pipelines:
//! - Engagement segmentation (percentile-based Low / Medium / High)
//! - New vs returning breakdown and category performance
//! - Time-series rollups by day, ISO week or month
//! - Disjoint conversion funnel stages
//! - Monthly acquisition cohorts
//! - Memoized global summary
//!
//! The queries themselves are methods on [`crate::Database`]; see
//! [`crate::db::queries`].

pub mod breakdown;
pub mod cohort;
pub mod engagement;
pub mod funnel;
pub mod summary;
pub mod timeseries;

pub use breakdown::{CategoryRow, UserType, UserTypeRow};
pub use cohort::CohortRow;
pub use engagement::{
    engagement_score, quantile_cont, EngagementSegment, EngagementSegmentRow,
    EngagementThresholds, ENGAGEMENT_SCORE_SQL,
};
pub use funnel::{FunnelStage, FunnelStageRow};
pub use summary::{SummaryCache, SummaryStats};
pub use timeseries::{Granularity, TimeseriesBucket};
