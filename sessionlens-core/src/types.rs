//! Core domain types for sessionlens
//!
//! One [`SessionEvent`] is one row of the `user_events` table: a single
//! visit with its behavioral metrics and outcome.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Column order of the `user_events` table and of the CSV input header.
pub const EVENT_COLUMNS: [&str; 10] = [
    "user_id",
    "session_id",
    "page_views",
    "time_on_page",
    "events_triggered",
    "category",
    "is_returning",
    "converted",
    "revenue",
    "session_date",
];

/// A single user session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// User identifier (many sessions per user)
    pub user_id: String,
    /// Globally unique session identifier
    pub session_id: String,
    /// Pages viewed, always at least 1
    pub page_views: i64,
    /// Seconds spent on page
    pub time_on_page: i64,
    /// Clicks, scrolls, form submissions, ...
    pub events_triggered: i64,
    /// Product category
    pub category: String,
    /// Whether the user had visited before
    pub is_returning: bool,
    /// Whether the session ended in a conversion
    pub converted: bool,
    /// Revenue attributed to the session (zero unless converted)
    pub revenue: f64,
    /// Calendar date of the session, `None` when the source was unparseable
    pub session_date: Option<NaiveDate>,
}

impl SessionEvent {
    /// Check the per-row invariants enforced at load time.
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_id.is_empty() {
            return Err("session_id must not be empty".to_string());
        }
        if self.page_views < 1 {
            return Err(format!("page_views must be >= 1, got {}", self.page_views));
        }
        if self.time_on_page < 0 {
            return Err(format!(
                "time_on_page must be >= 0, got {}",
                self.time_on_page
            ));
        }
        if self.events_triggered < 0 {
            return Err(format!(
                "events_triggered must be >= 0, got {}",
                self.events_triggered
            ));
        }
        if !self.revenue.is_finite() || self.revenue < 0.0 {
            return Err(format!(
                "revenue must be a finite amount >= 0, got {}",
                self.revenue
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> SessionEvent {
        SessionEvent {
            user_id: "user_00001".to_string(),
            session_id: "session_000001".to_string(),
            page_views: 3,
            time_on_page: 120,
            events_triggered: 4,
            category: "Books".to_string(),
            is_returning: false,
            converted: false,
            revenue: 0.0,
            session_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        }
    }

    #[test]
    fn test_validate_accepts_valid_row() {
        assert!(event().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_views() {
        let row = SessionEvent {
            page_views: 0,
            ..event()
        };
        let err = row.validate().unwrap_err();
        assert!(err.contains("page_views"));
    }

    #[test]
    fn test_validate_rejects_negative_revenue_and_nan() {
        let row = SessionEvent {
            revenue: -1.0,
            ..event()
        };
        assert!(row.validate().is_err());

        let row = SessionEvent {
            revenue: f64::NAN,
            ..event()
        };
        assert!(row.validate().is_err());

        let row = SessionEvent {
            revenue: f64::INFINITY,
            ..event()
        };
        assert!(row.validate().unwrap_err().contains("revenue"));
    }
}
