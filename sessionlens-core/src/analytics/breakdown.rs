//! User-type and category breakdowns.

use serde::Serialize;

/// New vs returning visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UserType {
    Returning,
    New,
}

impl UserType {
    pub fn from_returning(is_returning: bool) -> Self {
        if is_returning {
            UserType::Returning
        } else {
            UserType::New
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Returning => "Returning",
            UserType::New => "New",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates for new or returning sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTypeRow {
    pub user_type: UserType,
    pub unique_users: i64,
    pub total_sessions: i64,
    pub avg_page_views: f64,
    pub avg_time_on_page: f64,
    pub avg_events: f64,
    pub conversions: i64,
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub avg_revenue_per_session: f64,
}

/// Aggregates for one product category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub unique_users: i64,
    pub total_sessions: i64,
    pub avg_page_views: f64,
    pub avg_time_on_page: f64,
    pub avg_events: f64,
    pub conversions: i64,
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub avg_revenue_per_session: f64,
    /// Revenue per conversion; `None` when the category has no conversions
    pub avg_order_value: Option<f64>,
}
