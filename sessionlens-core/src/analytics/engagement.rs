//! Engagement segmentation.
//!
//! Each session gets a weighted engagement score. Sessions are split into
//! Low / Medium / High by the 33rd and 67th continuous percentiles of that
//! score across the whole table.

use serde::Serialize;

/// SQL expression computing a session's engagement score.
///
/// Shared by the percentile scan and the segment aggregation so both see the
/// exact same floating point values.
pub const ENGAGEMENT_SCORE_SQL: &str =
    "(page_views * 0.3 + time_on_page * 0.4 + events_triggered * 0.3)";

/// Lower segment boundary quantile
pub const LOW_QUANTILE: f64 = 0.33;
/// Upper segment boundary quantile
pub const HIGH_QUANTILE: f64 = 0.67;

/// Engagement segment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EngagementSegment {
    High,
    Medium,
    Low,
}

impl EngagementSegment {
    /// Output order of the segmentation table.
    pub const ORDER: [EngagementSegment; 3] = [
        EngagementSegment::High,
        EngagementSegment::Medium,
        EngagementSegment::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementSegment::High => "High",
            EngagementSegment::Medium => "Medium",
            EngagementSegment::Low => "Low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "High" => Some(EngagementSegment::High),
            "Medium" => Some(EngagementSegment::Medium),
            "Low" => Some(EngagementSegment::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for EngagementSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentile boundaries used to segment sessions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngagementThresholds {
    /// 33rd percentile; scores `<=` this are Low
    pub p33: f64,
    /// 67th percentile; scores `<=` this (and above p33) are Medium
    pub p67: f64,
}

impl EngagementThresholds {
    /// Compute thresholds from unsorted scores. `None` when there are none.
    pub fn from_scores(scores: &mut [f64]) -> Option<Self> {
        scores.sort_by(f64::total_cmp);
        Some(Self {
            p33: quantile_cont(scores, LOW_QUANTILE)?,
            p67: quantile_cont(scores, HIGH_QUANTILE)?,
        })
    }

    /// Classify a score. Ties at a boundary fall into the lower segment.
    pub fn classify(&self, score: f64) -> EngagementSegment {
        if score <= self.p33 {
            EngagementSegment::Low
        } else if score <= self.p67 {
            EngagementSegment::Medium
        } else {
            EngagementSegment::High
        }
    }
}

/// Continuous (linearly interpolated) quantile of sorted values.
///
/// Uses position `q * (n - 1)` and interpolates between the neighbouring
/// order statistics. Returns `None` for an empty slice.
pub fn quantile_cont(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let lower = sorted[lo];
    if lo == hi {
        return Some(lower);
    }
    let upper = sorted[hi];
    Some(lower + (pos - lo as f64) * (upper - lower))
}

/// Compute a session's engagement score in Rust (matches [`ENGAGEMENT_SCORE_SQL`]).
pub fn engagement_score(page_views: i64, time_on_page: i64, events_triggered: i64) -> f64 {
    page_views as f64 * 0.3 + time_on_page as f64 * 0.4 + events_triggered as f64 * 0.3
}

/// Aggregates for one engagement segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementSegmentRow {
    pub engagement_segment: EngagementSegment,
    pub unique_users: i64,
    pub total_sessions: i64,
    pub avg_page_views: f64,
    pub avg_time_on_page: f64,
    pub avg_events: f64,
    pub avg_engagement_score: f64,
    pub conversions: i64,
    /// Percent of sessions converted (2 decimals)
    pub conversion_rate: f64,
    pub total_revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_cont_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // pos = 0.5 * 3 = 1.5 -> halfway between 2 and 3
        assert_eq!(quantile_cont(&values, 0.5), Some(2.5));
        assert_eq!(quantile_cont(&values, 0.0), Some(1.0));
        assert_eq!(quantile_cont(&values, 1.0), Some(4.0));
    }

    #[test]
    fn test_quantile_cont_single_and_empty() {
        assert_eq!(quantile_cont(&[7.0], 0.33), Some(7.0));
        assert_eq!(quantile_cont(&[], 0.33), None);
    }

    #[test]
    fn test_quantile_cont_not_nearest_rank() {
        let values = [0.0, 10.0];
        let p33 = quantile_cont(&values, 0.33).unwrap();
        assert!((p33 - 3.3).abs() < 1e-9);
    }

    #[test]
    fn test_thresholds_boundary_goes_low() {
        let mut scores = vec![5.0, 5.0, 5.0];
        let t = EngagementThresholds::from_scores(&mut scores).unwrap();
        assert_eq!(t.p33, 5.0);
        assert_eq!(t.classify(5.0), EngagementSegment::Low);
    }

    #[test]
    fn test_thresholds_classify() {
        let t = EngagementThresholds { p33: 10.0, p67: 20.0 };
        assert_eq!(t.classify(9.9), EngagementSegment::Low);
        assert_eq!(t.classify(10.0), EngagementSegment::Low);
        assert_eq!(t.classify(10.1), EngagementSegment::Medium);
        assert_eq!(t.classify(20.0), EngagementSegment::Medium);
        assert_eq!(t.classify(20.1), EngagementSegment::High);
    }

    #[test]
    fn test_engagement_score_weights() {
        let score = engagement_score(10, 100, 10);
        assert!((score - 46.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_labels() {
        for segment in EngagementSegment::ORDER {
            assert_eq!(EngagementSegment::parse(segment.as_str()), Some(segment));
        }
        assert_eq!(EngagementSegment::parse("Extreme"), None);
    }
}
