//! Monthly acquisition cohorts.

use chrono::NaiveDate;
use serde::Serialize;

/// Activity of users grouped by the month of their first session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    /// First day of the cohort month; `None` for users without any dated session
    pub cohort_month: Option<NaiveDate>,
    /// Distinct session dates with activity from this cohort
    pub days_active: i64,
    /// Sum of daily distinct active users
    pub total_active_users: i64,
    pub total_conversions: i64,
    /// Mean over active days of conversions per active user, percent
    pub avg_conversion_rate: f64,
    pub total_revenue: f64,
}
