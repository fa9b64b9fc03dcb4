//! Database repository layer
//!
//! Owns the SQLite connection holding the `user_events` table and provides
//! the store primitives: schema creation, bulk insert and the read-only
//! query escape hatch. The analytics pipelines live in [`super::queries`].

use crate::error::{Error, Result};
use crate::types::SessionEvent;
use rusqlite::types::ValueRef;
use rusqlite::{params, Batch, Connection, ErrorCode};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Tabular result of an ad-hoc query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names in select order
    pub columns: Vec<String>,
    /// Row cells, aligned with `columns`
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    /// Number of rows returned.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the query produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as named-field records (column name -> value).
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        tracing::debug!(path = %path.display(), "Database opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open either an in-memory database (`":memory:"`) or a file.
    pub fn open_location(location: &str) -> Result<Self> {
        if location == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(Path::new(location))
        }
    }

    /// Lock the connection, recovering it if a previous holder panicked.
    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Close the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        conn.close().map_err(|(_, e)| Error::Database(e))?;
        tracing::debug!("Database closed");
        Ok(())
    }

    // ============================================
    // Schema
    // ============================================

    /// Drop and recreate the session-event table.
    pub fn create_schema(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::create_schema(&conn)
    }

    /// Whether the session-event table has been created.
    pub fn is_initialized(&self) -> Result<bool> {
        let conn = self.connection();
        super::schema::table_exists(&conn)
    }

    // ============================================
    // Event operations
    // ============================================

    /// Insert a batch of sessions in a single transaction.
    ///
    /// The batch is rejected as a whole if any row violates a row invariant
    /// or reuses an existing `session_id`. Returns the table row count after
    /// the insert.
    pub fn insert_events(&self, events: &[SessionEvent]) -> Result<usize> {
        let mut conn = self.connection();

        if !super::schema::table_exists(&conn)? {
            return Err(Error::Load(
                "user_events table is not initialized; call create_schema first".to_string(),
            ));
        }

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO user_events (
                    user_id, session_id, page_views, time_on_page, events_triggered,
                    category, is_returning, converted, revenue, session_date
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;

            for (idx, event) in events.iter().enumerate() {
                event.validate().map_err(|msg| {
                    Error::Load(format!("row {} ({}): {}", idx + 1, event.session_id, msg))
                })?;

                let session_date = event
                    .session_date
                    .map(|d| d.format("%Y-%m-%d").to_string());

                stmt.execute(params![
                    event.user_id,
                    event.session_id,
                    event.page_views,
                    event.time_on_page,
                    event.events_triggered,
                    event.category,
                    event.is_returning,
                    event.converted,
                    event.revenue,
                    session_date,
                ])
                .map_err(|e| match e.sqlite_error_code() {
                    Some(ErrorCode::ConstraintViolation) => {
                        Error::Load(format!("duplicate session_id: {}", event.session_id))
                    }
                    _ => Error::Database(e),
                })?;
            }
        }
        tx.commit()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM user_events", [], |r| r.get(0))?;

        tracing::info!(inserted = events.len(), total = count, "Events inserted");
        Ok(count as usize)
    }

    /// Count sessions in the event table.
    pub fn count_events(&self) -> Result<usize> {
        let conn = self.connection();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM user_events", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    // ============================================
    // Ad-hoc queries
    // ============================================

    /// Execute a single read-only SQL statement and return its rows.
    ///
    /// Input is rejected before anything runs when it holds more than one
    /// statement, could modify the database, or returns no columns
    /// (`BEGIN`, `ATTACH`, pragma assignments). Stored rows and connection
    /// state are never affected.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let conn = self.connection();

        let mut batch = Batch::new(&conn, sql);
        let mut stmt = batch
            .next()
            .map_err(|e| Error::Query(e.to_string()))?
            .ok_or_else(|| Error::Query("empty query".to_string()))?;
        if batch
            .next()
            .map_err(|e| Error::Query(e.to_string()))?
            .is_some()
        {
            return Err(Error::Query(
                "only a single statement is allowed".to_string(),
            ));
        }
        if !stmt.readonly() || stmt.column_count() == 0 {
            return Err(Error::Query(
                "only read-only statements returning rows are allowed".to_string(),
            ));
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(|e| Error::Query(e.to_string()))?;
        while let Some(row) = cursor.next().map_err(|e| Error::Query(e.to_string()))? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                let value = row.get_ref(i).map_err(|e| Error::Query(e.to_string()))?;
                cells.push(value_to_json(value));
            }
            rows.push(cells);
        }

        tracing::debug!(rows = rows.len(), columns = width, "Custom query executed");
        Ok(QueryResult { columns, rows })
    }

    /// Alias of [`Database::query`] for presentation-layer callers.
    pub fn execute_custom_query(&self, sql: &str) -> Result<QueryResult> {
        self.query(sql)
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::from(bytes.to_vec()),
    }
}
