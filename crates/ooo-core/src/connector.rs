//! Source connectors: time-bounded queries over one data domain each.
//!
//! Every domain is backed by a seeded SQLite database (the same schemas the
//! mock generators produce: `emails`, `events`, `messages`, `tasks`,
//! `commits`, all carrying a `custom_id`). A connector always returns a list
//! for "no data" and only errors for genuine storage failure.
//!
//! [`SessionGroup`] opens every configured connector up front as one scoped
//! resource group. Connections close on drop, so release happens on every
//! exit path of an orchestration run, including failure and cancellation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use crate::config::OrchestratorConfig;
use crate::error::{OooError, Result};
use crate::types::{SourceKind, SourceRecord, TimeRange};

// ---------------------------------------------------------------------------
// SourceConnector
// ---------------------------------------------------------------------------

/// The fixed capability interface the orchestrator depends on. One
/// implementation per [`SourceKind`]; the orchestrator never sees discovery
/// mechanics.
pub trait SourceConnector: Send {
    fn kind(&self) -> SourceKind;

    /// Records within `range`, newest first. Empty range = empty list.
    fn query(&self, range: &TimeRange) -> Result<Vec<SourceRecord>>;
}

// ---------------------------------------------------------------------------
// SqliteConnector
// ---------------------------------------------------------------------------

/// A connector session over one domain database.
#[derive(Debug)]
pub struct SqliteConnector {
    kind: SourceKind,
    conn: Connection,
}

impl SqliteConnector {
    /// Open the database read-only. A missing or unopenable file is a
    /// session failure, not a silent empty source.
    pub fn open(kind: SourceKind, path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| OooError::Session(format!("{kind}: cannot open {}: {e}", path.display())))?;
        Ok(SqliteConnector { kind, conn })
    }

    /// Domain-specific projection into the common record shape:
    /// `(custom_id, title, timestamp, raw_context)`.
    fn domain_sql(kind: SourceKind) -> &'static str {
        match kind {
            SourceKind::Email => {
                "SELECT custom_id, subject, received_date, 'From ' || sender || ': ' || body \
                 FROM emails WHERE date(received_date) BETWEEN ?1 AND ?2 \
                 ORDER BY received_date DESC"
            }
            SourceKind::Calendar => {
                "SELECT custom_id, title, start_time, COALESCE(description, '') || ' (' || start_time || ' to ' || end_time || ')' \
                 FROM events WHERE date(start_time) BETWEEN ?1 AND ?2 \
                 ORDER BY start_time DESC"
            }
            SourceKind::Chat => {
                "SELECT custom_id, '#' || channel || ' from ' || user, timestamp, message \
                 FROM messages WHERE date(timestamp) BETWEEN ?1 AND ?2 \
                 ORDER BY timestamp DESC"
            }
            SourceKind::Task => {
                "SELECT custom_id, title, updated_date, COALESCE(description, '') || ' [status: ' || status || ', priority: ' || priority || ']' \
                 FROM tasks WHERE date(updated_date) BETWEEN ?1 AND ?2 \
                 ORDER BY updated_date DESC"
            }
            SourceKind::Repository => {
                "SELECT custom_id, message, commit_date, repository || ' by ' || author \
                 FROM commits WHERE date(commit_date) BETWEEN ?1 AND ?2 \
                 ORDER BY commit_date DESC"
            }
        }
    }
}

impl SourceConnector for SqliteConnector {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn query(&self, range: &TimeRange) -> Result<Vec<SourceRecord>> {
        let mut stmt = self.conn.prepare(Self::domain_sql(self.kind))?;
        let start = range.start().to_string();
        let end = range.end().to_string();

        let rows = stmt.query_map([&start, &end], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, title, ts, raw_context) = row?;
            let Some(timestamp) = parse_timestamp(&ts) else {
                tracing::warn!(source = %self.kind, id, ts, "unparseable timestamp, skipping record");
                continue;
            };
            records.push(SourceRecord {
                id,
                source: self.kind,
                title,
                timestamp,
                raw_context,
            });
        }
        Ok(records)
    }
}

/// Accepts the timestamp shapes the seeded databases contain:
/// `YYYY-MM-DD HH:MM:SS`, ISO-8601 `T` form, or a bare date (midnight).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc())
}

// ---------------------------------------------------------------------------
// SessionGroup
// ---------------------------------------------------------------------------

/// All configured connector sessions for one orchestration run.
///
/// Exclusively owned by that run; connections close when the group drops.
pub struct SessionGroup {
    connectors: Vec<Box<dyn SourceConnector>>,
}

impl SessionGroup {
    /// Open every configured connector; if any fails, already-open sessions
    /// are released (drop) and the whole group fails with a session error.
    pub fn open(config: &OrchestratorConfig) -> Result<Self> {
        let mut connectors: Vec<Box<dyn SourceConnector>> = Vec::new();
        for kind in &config.sources {
            let connector = SqliteConnector::open(*kind, &config.database_path(*kind))?;
            connectors.push(Box::new(connector));
        }
        tracing::debug!(count = connectors.len(), "connector sessions open");
        Ok(SessionGroup { connectors })
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.connectors.iter().map(|c| c.kind()).collect()
    }

    /// One data-collection pass: query every connector over the same range.
    pub fn collect(&self, range: &TimeRange) -> Result<Vec<SourceRecord>> {
        let mut all = Vec::new();
        for connector in &self.connectors {
            let records = connector.query(range)?;
            tracing::debug!(source = %connector.kind(), count = records.len(), "queried");
            all.extend(records);
        }
        Ok(all)
    }
}

impl Drop for SessionGroup {
    fn drop(&mut self) {
        // Connection teardown happens in each connector's own drop; failures
        // there must never escape the orchestrator boundary.
        tracing::debug!(count = self.connectors.len(), "connector sessions released");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
