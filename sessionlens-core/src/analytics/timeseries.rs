//! Time-bucketed conversion rollups.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Width of a time-series bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    /// ISO week, starting Monday
    Week,
    /// Calendar month
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    /// Parse a granularity name, falling back to [`Granularity::Day`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "day" => Granularity::Day,
            "week" => Granularity::Week,
            "month" => Granularity::Month,
            other => {
                tracing::warn!(granularity = other, "Unknown granularity, using day");
                Granularity::Day
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// SQL expression truncating `session_date` to the bucket start.
    pub(crate) fn truncate_sql(&self) -> &'static str {
        match self {
            Granularity::Day => "date(session_date)",
            // Step back six days, then forward to the next Monday
            Granularity::Week => "date(session_date, '-6 days', 'weekday 1')",
            Granularity::Month => "date(session_date, 'start of month')",
        }
    }

    /// Truncate a date to the start of its bucket.
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates for one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeseriesBucket {
    /// Bucket start; `None` collects sessions without a date
    pub period: Option<NaiveDate>,
    pub total_sessions: i64,
    pub unique_users: i64,
    pub conversions: i64,
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub avg_page_views: f64,
    pub avg_time_on_page: f64,
    pub returning_sessions: i64,
    pub new_sessions: i64,
}
