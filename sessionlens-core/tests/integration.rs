//! Integration tests for the sessionlens event store and pipelines
//!
//! These tests load `tests/fixtures/user_events.csv` (12 sessions, 8 users,
//! one unparseable date) through the public API and check the resulting
//! summary tables end to end.

use sessionlens_core::analytics::{EngagementSegment, FunnelStage, Granularity, UserType};
use sessionlens_core::{Database, Error, LoadOptions, SummaryCache};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const HEADER: &str = "user_id,session_id,page_views,time_on_page,events_triggered,category,is_returning,converted,revenue,session_date";

/// Get the path to a fixture file
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Open an in-memory store loaded with the standard fixture
fn loaded_db() -> Database {
    sessionlens_core::logging::init_test();
    let db = Database::open_in_memory().expect("open");
    db.create_schema().expect("schema");
    let count = db
        .load_csv(&fixture_path("user_events.csv"))
        .expect("load should succeed");
    assert_eq!(count, 12);
    db
}

/// Write a CSV body (header added) into a temp dir
fn write_csv(dir: &TempDir, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut body = String::from(HEADER);
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    fs::write(&path, body).expect("write csv");
    path
}

// ============================================
// Loading
// ============================================

#[test]
fn test_load_then_summary_counts_rows() {
    let db = Arc::new(loaded_db());
    let cache = SummaryCache::new(Arc::clone(&db));

    let stats = cache.get().expect("summary");
    assert_eq!(stats.total_sessions, 12);
    assert_eq!(stats.unique_users, 8);
    assert_eq!(stats.total_conversions, 4);
    assert_eq!(stats.conversion_rate, 33.33);
    assert_eq!(stats.total_revenue, 477.99);
}

#[test]
fn test_unparseable_date_kept_as_null() {
    let db = loaded_db();
    let result = db
        .query("SELECT session_id FROM user_events WHERE session_date IS NULL")
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.rows[0][0], serde_json::json!("session_000012"));
}

#[test]
fn test_reload_of_same_file_rejected() {
    let db = loaded_db();

    let err = db
        .load_csv(&fixture_path("user_events.csv"))
        .expect_err("duplicate sessions must be rejected");
    assert!(matches!(err, Error::Load(_)));
    assert_eq!(db.count_events().unwrap(), 12);
}

#[test]
fn test_create_schema_resets_table() {
    let db = loaded_db();
    db.create_schema().unwrap();
    assert_eq!(db.count_events().unwrap(), 0);

    // The same file loads cleanly again
    assert_eq!(db.load_csv(&fixture_path("user_events.csv")).unwrap(), 12);
}

#[test]
fn test_load_columns_in_any_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reordered.csv");
    fs::write(
        &path,
        "session_date,revenue,converted,is_returning,category,events_triggered,time_on_page,page_views,session_id,user_id\n\
         03/01/2024,12.5,true,false,Books,2,90,3,s1,u1\n",
    )
    .unwrap();

    let db = Database::open_in_memory().unwrap();
    db.create_schema().unwrap();
    assert_eq!(db.load_csv(&path).unwrap(), 1);

    let categories = db.get_category_performance().unwrap();
    assert_eq!(categories[0].avg_order_value, Some(12.5));
}

#[test]
fn test_load_tab_delimited() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.tsv");
    fs::write(
        &path,
        format!(
            "{}\nu1\ts1\t2\t10\t1\tBooks\t1\t0\t0\t04/02/2024\n",
            HEADER.replace(',', "\t")
        ),
    )
    .unwrap();

    let db = Database::open_in_memory().unwrap();
    db.create_schema().unwrap();
    let count = db
        .load_csv_with(&path, &LoadOptions { delimiter: b'\t' })
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_malformed_boolean_aborts_load() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "bad.csv",
        &[
            "u1,s1,2,10,1,Books,1,0,0,01/01/2024",
            "u2,s2,2,10,1,Books,sometimes,0,0,01/01/2024",
        ],
    );

    let db = Database::open_in_memory().unwrap();
    db.create_schema().unwrap();
    let err = db.load_csv(&path).unwrap_err();
    match err {
        Error::Load(msg) => assert!(msg.contains("is_returning"), "{msg}"),
        other => panic!("expected load error, got {other:?}"),
    }
    assert_eq!(db.count_events().unwrap(), 0);
}

#[test]
fn test_on_disk_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested/events.db");

    {
        let db = Database::open(&db_path).unwrap();
        db.create_schema().unwrap();
        db.load_csv(&fixture_path("user_events.csv")).unwrap();
        db.close().unwrap();
    }

    let db = Database::open(&db_path).unwrap();
    assert!(db.is_initialized().unwrap());
    assert_eq!(db.get_summary_stats().unwrap().total_sessions, 12);
}

// ============================================
// Pipelines
// ============================================

#[test]
fn test_engagement_segments_partition_table() {
    let db = loaded_db();
    let rows = db.get_engagement_segmentation().unwrap();

    assert_eq!(rows.iter().map(|r| r.total_sessions).sum::<i64>(), 12);
    assert_eq!(rows[0].engagement_segment, EngagementSegment::High);
    assert_eq!(rows.last().unwrap().engagement_segment, EngagementSegment::Low);

    // Every session's score is consistent with its segment's thresholds
    let thresholds = db.get_engagement_thresholds().unwrap().unwrap();
    assert!(thresholds.p33 <= thresholds.p67);
}

#[test]
fn test_user_type_breakdown() {
    let db = loaded_db();
    let rows = db.get_user_type_breakdown().unwrap();

    assert_eq!(rows.len(), 2);
    let returning = &rows[0];
    assert_eq!(returning.user_type, UserType::Returning);
    assert_eq!(returning.total_sessions, 5);
    assert_eq!(returning.conversions, 3);
    assert_eq!(returning.conversion_rate, 60.0);
    assert_eq!(returning.total_revenue, 459.49);

    let new = &rows[1];
    assert_eq!(new.user_type, UserType::New);
    assert_eq!(new.total_sessions, 7);
    assert_eq!(new.conversion_rate, 14.29);
}

#[test]
fn test_category_performance_order_and_aov() {
    let db = loaded_db();
    let rows = db.get_category_performance().unwrap();

    let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(
        names,
        vec!["Electronics", "Clothing", "Books", "Home & Garden", "Sports"]
    );

    assert_eq!(rows[1].avg_order_value, Some(104.75));
    assert_eq!(rows[2].total_sessions, 4);
    assert_eq!(rows[2].conversion_rate, 25.0);
    assert_eq!(rows[3].avg_order_value, None);
    assert_eq!(rows[4].avg_order_value, None);
}

#[test]
fn test_weekly_timeseries() {
    let db = loaded_db();
    let rows = db.get_timeseries_conversion(Granularity::Week).unwrap();

    let periods: Vec<String> = rows
        .iter()
        .map(|r| {
            r.period
                .map(|d| d.to_string())
                .unwrap_or_else(|| "null".to_string())
        })
        .collect();
    assert_eq!(
        periods,
        vec![
            "2024-01-01",
            "2024-01-08",
            "2024-01-15",
            "2024-01-29",
            "2024-02-12",
            "2024-02-19",
            "null"
        ]
    );
    assert_eq!(rows[0].total_sessions, 3);
    assert_eq!(rows.iter().map(|r| r.total_sessions).sum::<i64>(), 12);
    for row in &rows {
        assert_eq!(row.returning_sessions + row.new_sessions, row.total_sessions);
    }
}

#[test]
fn test_monthly_timeseries() {
    let db = loaded_db();
    let rows = db.get_timeseries_conversion(Granularity::Month).unwrap();

    let sessions: Vec<i64> = rows.iter().map(|r| r.total_sessions).collect();
    assert_eq!(sessions, vec![7, 4, 1]);
    assert!(rows[2].period.is_none());
}

#[test]
fn test_conversion_funnel() {
    let db = loaded_db();
    let rows = db.get_conversion_funnel().unwrap();

    let stages: Vec<FunnelStage> = rows.iter().map(|r| r.funnel_stage).collect();
    assert_eq!(stages, FunnelStage::ORDER.to_vec());

    let sessions: Vec<i64> = rows.iter().map(|r| r.sessions).collect();
    assert_eq!(sessions, vec![2, 2, 3, 1, 4]);

    let converted = rows.last().unwrap();
    assert_eq!(converted.conversion_rate, 100.0);
    assert_eq!(converted.revenue, 477.99);
}

#[test]
fn test_cohorts_cover_all_users() {
    let db = loaded_db();
    let rows = db.get_cohort_analysis().unwrap();

    assert!(!rows.is_empty());
    let total_revenue: f64 = rows.iter().map(|r| r.total_revenue).sum();
    assert!((total_revenue - 477.99).abs() < 1e-6);
    // user_00008 only has the undated session
    assert!(rows.last().unwrap().cohort_month.is_none());
}

#[test]
fn test_custom_query_is_read_only() {
    let db = loaded_db();

    let result = db
        .execute_custom_query(
            "SELECT category, COUNT(*) AS sessions FROM user_events GROUP BY category ORDER BY sessions DESC, category",
        )
        .unwrap();
    assert_eq!(result.columns, vec!["category", "sessions"]);
    assert_eq!(result.records()[0]["category"], serde_json::json!("Books"));

    let err = db
        .execute_custom_query("INSERT INTO user_events SELECT * FROM user_events")
        .unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert_eq!(db.count_events().unwrap(), 12);
}

#[test]
fn test_custom_query_cannot_smuggle_writes() {
    let db = loaded_db();

    for sql in [
        "SELECT COUNT(*) FROM user_events; DELETE FROM user_events",
        "BEGIN",
        "BEGIN IMMEDIATE",
    ] {
        let err = db.execute_custom_query(sql).unwrap_err();
        assert!(matches!(err, Error::Query(_)), "{sql} should be rejected");
    }
    assert_eq!(db.count_events().unwrap(), 12);

    // The store still accepts a reload afterwards
    db.create_schema().unwrap();
    assert_eq!(db.load_csv(&fixture_path("user_events.csv")).unwrap(), 12);
}

// ============================================
// Empty store
// ============================================

#[test]
fn test_empty_file_loads_zero_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "empty.csv", &[]);

    let db = Arc::new(Database::open_in_memory().unwrap());
    db.create_schema().unwrap();
    assert_eq!(db.load_csv(&path).unwrap(), 0);

    assert!(db.get_engagement_segmentation().unwrap().is_empty());
    assert!(db.get_user_type_breakdown().unwrap().is_empty());
    assert!(db.get_category_performance().unwrap().is_empty());
    assert!(db
        .get_timeseries_conversion(Granularity::Day)
        .unwrap()
        .is_empty());
    let funnel = db.get_conversion_funnel().unwrap();
    assert_eq!(funnel.len(), 5);
    assert!(funnel.iter().all(|r| r.sessions == 0 && r.conversion_rate == 0.0));

    let stats = SummaryCache::new(db).get().unwrap();
    assert_eq!(stats.total_sessions, 0);
    assert_eq!(stats.conversion_rate, 0.0);
}
