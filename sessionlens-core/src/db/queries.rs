//! Analytics queries over the event table
//!
//! Every pipeline is a read-only scan of `user_events` returning a small,
//! deterministically ordered table. Rates are percentages; averages, rates
//! and revenue are rounded to two decimals by SQLite.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::Row;

use super::Database;
use crate::analytics::{
    CategoryRow, CohortRow, EngagementSegment, EngagementSegmentRow, EngagementThresholds,
    FunnelStage, FunnelStageRow, Granularity, SummaryStats, TimeseriesBucket, UserType,
    UserTypeRow, ENGAGEMENT_SCORE_SQL,
};
use crate::error::Result;

/// Aggregate columns shared by the segment, user-type and category tables.
/// Occupies eight consecutive result columns; see [`Aggregates::from_row`].
const COMMON_AGGREGATES_SQL: &str = r#"
    COUNT(DISTINCT user_id)           AS unique_users,
    COUNT(*)                          AS total_sessions,
    ROUND(AVG(page_views), 2)         AS avg_page_views,
    ROUND(AVG(time_on_page), 2)       AS avg_time_on_page,
    ROUND(AVG(events_triggered), 2)   AS avg_events,
    SUM(converted)                    AS conversions,
    ROUND(AVG(converted) * 100.0, 2)  AS conversion_rate,
    ROUND(SUM(revenue), 2)            AS total_revenue
"#;

/// The columns produced by [`COMMON_AGGREGATES_SQL`].
struct Aggregates {
    unique_users: i64,
    total_sessions: i64,
    avg_page_views: f64,
    avg_time_on_page: f64,
    avg_events: f64,
    conversions: i64,
    conversion_rate: f64,
    total_revenue: f64,
}

impl Aggregates {
    fn from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            unique_users: row.get(start)?,
            total_sessions: row.get(start + 1)?,
            avg_page_views: row.get(start + 2)?,
            avg_time_on_page: row.get(start + 3)?,
            avg_events: row.get(start + 4)?,
            conversions: row.get(start + 5)?,
            conversion_rate: row.get(start + 6)?,
            total_revenue: row.get(start + 7)?,
        })
    }
}

fn conversion_failure(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// Read a nullable `YYYY-MM-DD` column.
fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| conversion_failure(idx, format!("invalid date {s:?}: {e}")))
        })
        .transpose()
}

impl Database {
    // ============================================
    // Engagement segmentation
    // ============================================

    /// Continuous 33rd/67th percentiles of the engagement score.
    ///
    /// `None` when the table is empty.
    pub fn get_engagement_thresholds(&self) -> Result<Option<EngagementThresholds>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!("SELECT {ENGAGEMENT_SCORE_SQL} FROM user_events"))?;
        let mut scores = stmt
            .query_map([], |row| row.get::<_, f64>(0))?
            .collect::<rusqlite::Result<Vec<f64>>>()?;

        Ok(EngagementThresholds::from_scores(&mut scores))
    }

    /// Segment sessions into Low / Medium / High engagement.
    ///
    /// Ordered High, Medium, Low. Segments without sessions are omitted, so
    /// an empty table yields no rows.
    pub fn get_engagement_segmentation(&self) -> Result<Vec<EngagementSegmentRow>> {
        let Some(thresholds) = self.get_engagement_thresholds()? else {
            return Ok(Vec::new());
        };

        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            r#"
            WITH scored AS (
                SELECT
                    user_id,
                    page_views,
                    time_on_page,
                    events_triggered,
                    converted,
                    revenue,
                    {ENGAGEMENT_SCORE_SQL} AS engagement_score
                FROM user_events
            )
            SELECT
                CASE
                    WHEN engagement_score <= ?1 THEN 'Low'
                    WHEN engagement_score <= ?2 THEN 'Medium'
                    ELSE 'High'
                END AS engagement_segment,
                {COMMON_AGGREGATES_SQL},
                ROUND(AVG(engagement_score), 2) AS avg_engagement_score
            FROM scored
            GROUP BY engagement_segment
            "#
        ))?;

        let mut rows = stmt
            .query_map([thresholds.p33, thresholds.p67], |row| {
                let label: String = row.get(0)?;
                let segment = EngagementSegment::parse(&label)
                    .ok_or_else(|| conversion_failure(0, format!("unknown segment {label:?}")))?;
                let agg = Aggregates::from_row(row, 1)?;
                Ok(EngagementSegmentRow {
                    engagement_segment: segment,
                    unique_users: agg.unique_users,
                    total_sessions: agg.total_sessions,
                    avg_page_views: agg.avg_page_views,
                    avg_time_on_page: agg.avg_time_on_page,
                    avg_events: agg.avg_events,
                    avg_engagement_score: row.get(9)?,
                    conversions: agg.conversions,
                    conversion_rate: agg.conversion_rate,
                    total_revenue: agg.total_revenue,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.sort_by_key(|r| {
            EngagementSegment::ORDER
                .iter()
                .position(|s| *s == r.engagement_segment)
        });

        tracing::debug!(
            p33 = thresholds.p33,
            p67 = thresholds.p67,
            rows = rows.len(),
            "Engagement segmentation computed"
        );
        Ok(rows)
    }

    // ============================================
    // User type breakdown
    // ============================================

    /// Metrics for new vs returning sessions, Returning first.
    pub fn get_user_type_breakdown(&self) -> Result<Vec<UserTypeRow>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT
                is_returning,
                {COMMON_AGGREGATES_SQL},
                ROUND(AVG(revenue), 2) AS avg_revenue_per_session
            FROM user_events
            GROUP BY is_returning
            ORDER BY is_returning DESC
            "#
        ))?;

        let rows = stmt
            .query_map([], |row| {
                let agg = Aggregates::from_row(row, 1)?;
                Ok(UserTypeRow {
                    user_type: UserType::from_returning(row.get(0)?),
                    unique_users: agg.unique_users,
                    total_sessions: agg.total_sessions,
                    avg_page_views: agg.avg_page_views,
                    avg_time_on_page: agg.avg_time_on_page,
                    avg_events: agg.avg_events,
                    conversions: agg.conversions,
                    conversion_rate: agg.conversion_rate,
                    total_revenue: agg.total_revenue,
                    avg_revenue_per_session: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(rows = rows.len(), "User type breakdown computed");
        Ok(rows)
    }

    // ============================================
    // Category performance
    // ============================================

    /// Metrics per product category, highest revenue first.
    pub fn get_category_performance(&self) -> Result<Vec<CategoryRow>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT
                category,
                {COMMON_AGGREGATES_SQL},
                ROUND(AVG(revenue), 2) AS avg_revenue_per_session,
                ROUND(SUM(revenue) / NULLIF(SUM(converted), 0), 2) AS avg_order_value
            FROM user_events
            GROUP BY category
            ORDER BY total_revenue DESC, category ASC
            "#
        ))?;

        let rows = stmt
            .query_map([], |row| {
                let agg = Aggregates::from_row(row, 1)?;
                Ok(CategoryRow {
                    category: row.get(0)?,
                    unique_users: agg.unique_users,
                    total_sessions: agg.total_sessions,
                    avg_page_views: agg.avg_page_views,
                    avg_time_on_page: agg.avg_time_on_page,
                    avg_events: agg.avg_events,
                    conversions: agg.conversions,
                    conversion_rate: agg.conversion_rate,
                    total_revenue: agg.total_revenue,
                    avg_revenue_per_session: row.get(9)?,
                    avg_order_value: row.get(10)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(rows = rows.len(), "Category performance computed");
        Ok(rows)
    }

    // ============================================
    // Time series
    // ============================================

    /// Conversion metrics per time bucket, oldest first.
    ///
    /// Sessions without a date are collected in a final bucket whose
    /// `period` is `None`.
    pub fn get_timeseries_conversion(
        &self,
        granularity: Granularity,
    ) -> Result<Vec<TimeseriesBucket>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            r#"
            WITH bucketed AS (
                SELECT {trunc} AS period, *
                FROM user_events
            )
            SELECT
                period,
                COUNT(*)                                  AS total_sessions,
                COUNT(DISTINCT user_id)                   AS unique_users,
                SUM(converted)                            AS conversions,
                ROUND(AVG(converted) * 100.0, 2)          AS conversion_rate,
                ROUND(SUM(revenue), 2)                    AS total_revenue,
                ROUND(AVG(page_views), 2)                 AS avg_page_views,
                ROUND(AVG(time_on_page), 2)               AS avg_time_on_page,
                SUM(CASE WHEN is_returning THEN 1 ELSE 0 END)     AS returning_sessions,
                SUM(CASE WHEN NOT is_returning THEN 1 ELSE 0 END) AS new_sessions
            FROM bucketed
            GROUP BY period
            ORDER BY period IS NULL, period
            "#,
            trunc = granularity.truncate_sql()
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TimeseriesBucket {
                    period: get_date(row, 0)?,
                    total_sessions: row.get(1)?,
                    unique_users: row.get(2)?,
                    conversions: row.get(3)?,
                    conversion_rate: row.get(4)?,
                    total_revenue: row.get(5)?,
                    avg_page_views: row.get(6)?,
                    avg_time_on_page: row.get(7)?,
                    returning_sessions: row.get(8)?,
                    new_sessions: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(
            granularity = %granularity,
            rows = rows.len(),
            "Time series computed"
        );
        Ok(rows)
    }

    // ============================================
    // Conversion funnel
    // ============================================

    /// Sessions per disjoint funnel stage.
    ///
    /// Always returns all five stages in [`FunnelStage::ORDER`]; stages with
    /// no sessions have zero counts.
    pub fn get_conversion_funnel(&self) -> Result<Vec<FunnelStageRow>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT
                {case} AS funnel_stage,
                COUNT(*) AS sessions,
                ROUND(CAST(SUM(converted) AS REAL) / COUNT(*) * 100.0, 2) AS conversion_rate,
                ROUND(SUM(revenue), 2) AS revenue
            FROM user_events
            GROUP BY funnel_stage
            "#,
            case = FunnelStage::case_sql()
        ))?;

        let mut by_stage: HashMap<FunnelStage, FunnelStageRow> = stmt
            .query_map([], |row| {
                let label: String = row.get(0)?;
                let stage = FunnelStage::parse(&label)
                    .ok_or_else(|| conversion_failure(0, format!("unknown stage {label:?}")))?;
                Ok((
                    stage,
                    FunnelStageRow {
                        funnel_stage: stage,
                        sessions: row.get(1)?,
                        conversion_rate: row.get(2)?,
                        revenue: row.get(3)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;

        let rows: Vec<FunnelStageRow> = FunnelStage::ORDER
            .into_iter()
            .map(|stage| {
                by_stage
                    .remove(&stage)
                    .unwrap_or_else(|| FunnelStageRow::empty(stage))
            })
            .collect();

        tracing::debug!("Conversion funnel computed");
        Ok(rows)
    }

    // ============================================
    // Cohorts
    // ============================================

    /// Activity grouped by the month of each user's first session.
    pub fn get_cohort_analysis(&self) -> Result<Vec<CohortRow>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            r#"
            WITH user_first_session AS (
                SELECT user_id, MIN(session_date) AS cohort_date
                FROM user_events
                GROUP BY user_id
            ),
            cohort_data AS (
                SELECT
                    date(ufs.cohort_date, 'start of month') AS cohort_month,
                    ue.session_date,
                    COUNT(DISTINCT ue.user_id) AS active_users,
                    SUM(ue.converted) AS conversions,
                    SUM(ue.revenue) AS revenue
                FROM user_events ue
                JOIN user_first_session ufs ON ue.user_id = ufs.user_id
                GROUP BY cohort_month, ue.session_date
            )
            SELECT
                cohort_month,
                COUNT(DISTINCT session_date) AS days_active,
                SUM(active_users) AS total_active_users,
                SUM(conversions) AS total_conversions,
                COALESCE(ROUND(AVG(CAST(conversions AS REAL) / NULLIF(active_users, 0)) * 100.0, 2), 0)
                    AS avg_conversion_rate,
                ROUND(SUM(revenue), 2) AS total_revenue
            FROM cohort_data
            GROUP BY cohort_month
            ORDER BY cohort_month IS NULL, cohort_month
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(CohortRow {
                    cohort_month: get_date(row, 0)?,
                    days_active: row.get(1)?,
                    total_active_users: row.get(2)?,
                    total_conversions: row.get(3)?,
                    avg_conversion_rate: row.get(4)?,
                    total_revenue: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(rows = rows.len(), "Cohort analysis computed");
        Ok(rows)
    }

    // ============================================
    // Summary
    // ============================================

    /// Whole-table summary. Prefer [`crate::analytics::SummaryCache`] for
    /// repeated reads.
    pub fn get_summary_stats(&self) -> Result<SummaryStats> {
        let conn = self.connection();
        let stats = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COUNT(DISTINCT user_id),
                COALESCE(SUM(converted), 0),
                COALESCE(ROUND(AVG(converted) * 100.0, 2), 0),
                COALESCE(ROUND(SUM(revenue), 2), 0),
                COALESCE(ROUND(AVG(revenue), 2), 0),
                COALESCE(ROUND(AVG(page_views), 2), 0),
                COALESCE(ROUND(AVG(time_on_page), 2), 0)
            FROM user_events
            "#,
            [],
            |row| {
                Ok(SummaryStats {
                    total_sessions: row.get(0)?,
                    unique_users: row.get(1)?,
                    total_conversions: row.get(2)?,
                    conversion_rate: row.get(3)?,
                    total_revenue: row.get(4)?,
                    avg_revenue_per_session: row.get(5)?,
                    avg_page_views: row.get(6)?,
                    avg_time_on_page: row.get(7)?,
                })
            },
        )?;

        Ok(stats)
    }
}
