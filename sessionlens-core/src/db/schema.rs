//! Database schema
//!
//! The event table is rebuilt from scratch on every [`create_schema`] call;
//! the dataset is a batch loaded once per process, so there is nothing to
//! migrate. `PRAGMA user_version` records which layout is present.

use rusqlite::Connection;

use crate::error::{Error, Result};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the canonical session-event table
pub const EVENTS_TABLE: &str = "user_events";

const CREATE_SCHEMA: &str = r#"
    DROP INDEX IF EXISTS idx_user_events_date;
    DROP INDEX IF EXISTS idx_user_events_category;
    DROP INDEX IF EXISTS idx_user_events_user;
    DROP TABLE IF EXISTS user_events;

    CREATE TABLE user_events (
        user_id          TEXT NOT NULL,
        session_id       TEXT PRIMARY KEY,
        page_views       INTEGER NOT NULL,
        time_on_page     INTEGER NOT NULL,
        events_triggered INTEGER NOT NULL,
        category         TEXT NOT NULL,
        is_returning     INTEGER NOT NULL,   -- 0/1
        converted        INTEGER NOT NULL,   -- 0/1
        revenue          REAL NOT NULL DEFAULT 0,
        session_date     DATE                -- YYYY-MM-DD, NULL when unparseable
    );

    CREATE INDEX idx_user_events_date ON user_events(session_date);
    CREATE INDEX idx_user_events_category ON user_events(category);
    CREATE INDEX idx_user_events_user ON user_events(user_id);
"#;

/// Drop and recreate the event table, discarding any prior contents.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_SCHEMA).map_err(Error::Schema)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(Error::Schema)?;

    tracing::info!(
        table = EVENTS_TABLE,
        version = SCHEMA_VERSION,
        "Event table created"
    );
    Ok(())
}

/// Whether the event table exists on this connection.
pub fn table_exists(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [EVENTS_TABLE],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
