//! Conversion funnel.
//!
//! Stages are disjoint: every session lands in exactly one stage, picked by
//! the first matching rule in [`FunnelStage::PRIORITY`]. The counts are not
//! cumulative ("reached at least this stage").

use serde::Serialize;

/// Funnel stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FunnelStage {
    #[serde(rename = "All Sessions")]
    AllSessions,
    #[serde(rename = "With Page Views")]
    WithPageViews,
    #[serde(rename = "With Events")]
    WithEvents,
    #[serde(rename = "High Engagement")]
    HighEngagement,
    #[serde(rename = "Converted")]
    Converted,
}

impl FunnelStage {
    /// Output order of the funnel table.
    pub const ORDER: [FunnelStage; 5] = [
        FunnelStage::AllSessions,
        FunnelStage::WithPageViews,
        FunnelStage::WithEvents,
        FunnelStage::HighEngagement,
        FunnelStage::Converted,
    ];

    /// Classification order; the first matching stage wins.
    pub const PRIORITY: [FunnelStage; 5] = [
        FunnelStage::Converted,
        FunnelStage::HighEngagement,
        FunnelStage::WithEvents,
        FunnelStage::WithPageViews,
        FunnelStage::AllSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FunnelStage::AllSessions => "All Sessions",
            FunnelStage::WithPageViews => "With Page Views",
            FunnelStage::WithEvents => "With Events",
            FunnelStage::HighEngagement => "High Engagement",
            FunnelStage::Converted => "Converted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|stage| stage.as_str() == s)
    }

    /// SQL predicate selecting sessions that satisfy this stage's rule.
    ///
    /// Only meaningful when evaluated in [`Self::PRIORITY`] order.
    fn predicate_sql(&self) -> &'static str {
        match self {
            FunnelStage::Converted => "converted = 1",
            FunnelStage::HighEngagement => {
                "time_on_page > 100 AND events_triggered > 0 AND page_views > 1"
            }
            FunnelStage::WithEvents => "events_triggered > 0 AND page_views > 1",
            FunnelStage::WithPageViews => "page_views > 1",
            FunnelStage::AllSessions => "1 = 1",
        }
    }

    /// `CASE` expression assigning each row its stage label.
    pub(crate) fn case_sql() -> String {
        let mut sql = String::from("CASE");
        for stage in Self::PRIORITY {
            if stage == FunnelStage::AllSessions {
                continue;
            }
            sql.push_str(&format!(
                " WHEN {} THEN '{}'",
                stage.predicate_sql(),
                stage.as_str()
            ));
        }
        sql.push_str(&format!(" ELSE '{}' END", FunnelStage::AllSessions.as_str()));
        sql
    }

    /// Classify a session by the same rules the SQL applies.
    pub fn classify(
        converted: bool,
        page_views: i64,
        time_on_page: i64,
        events_triggered: i64,
    ) -> Self {
        if converted {
            FunnelStage::Converted
        } else if time_on_page > 100 && events_triggered > 0 && page_views > 1 {
            FunnelStage::HighEngagement
        } else if events_triggered > 0 && page_views > 1 {
            FunnelStage::WithEvents
        } else if page_views > 1 {
            FunnelStage::WithPageViews
        } else {
            FunnelStage::AllSessions
        }
    }
}

impl std::fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates for one funnel stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStageRow {
    pub funnel_stage: FunnelStage,
    pub sessions: i64,
    /// Conversions in this stage over sessions in this stage, percent
    pub conversion_rate: f64,
    pub revenue: f64,
}

impl FunnelStageRow {
    /// Row for a stage with no sessions.
    pub fn empty(funnel_stage: FunnelStage) -> Self {
        Self {
            funnel_stage,
            sessions: 0,
            conversion_rate: 0.0,
            revenue: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_priority() {
        // Converted wins over everything else
        assert_eq!(FunnelStage::classify(true, 10, 500, 5), FunnelStage::Converted);
        assert_eq!(FunnelStage::classify(true, 1, 0, 0), FunnelStage::Converted);
        assert_eq!(
            FunnelStage::classify(false, 2, 101, 1),
            FunnelStage::HighEngagement
        );
        // time_on_page must be strictly greater than 100
        assert_eq!(FunnelStage::classify(false, 2, 100, 1), FunnelStage::WithEvents);
        assert_eq!(FunnelStage::classify(false, 2, 500, 0), FunnelStage::WithPageViews);
        assert_eq!(FunnelStage::classify(false, 1, 500, 9), FunnelStage::AllSessions);
    }

    #[test]
    fn test_case_sql_lists_rules_in_priority_order() {
        let sql = FunnelStage::case_sql();
        let converted = sql.find("'Converted'").unwrap();
        let high = sql.find("'High Engagement'").unwrap();
        let events = sql.find("'With Events'").unwrap();
        let views = sql.find("'With Page Views'").unwrap();
        assert!(converted < high && high < events && events < views);
        assert!(sql.ends_with("ELSE 'All Sessions' END"));
    }

    #[test]
    fn test_labels_round_trip() {
        for stage in FunnelStage::ORDER {
            assert_eq!(FunnelStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(
            serde_json::to_value(FunnelStage::WithPageViews).unwrap(),
            serde_json::json!("With Page Views")
        );
    }
}
