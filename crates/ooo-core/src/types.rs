use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OooError, Result};

// ---------------------------------------------------------------------------
// TimeRange
// ---------------------------------------------------------------------------

/// An inclusive calendar-date range. Immutable once constructed; every
/// connector query and every prompt render consumes the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeRange {
    /// Construct a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(OooError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(TimeRange { start, end })
    }

    /// Parse a range from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse_one = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| OooError::Configuration(format!("invalid date '{s}': {e}")))
        };
        TimeRange::new(parse_one(start)?, parse_one(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// The data domains the summarizer knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Email,
    Calendar,
    Chat,
    Task,
    Repository,
}

impl SourceKind {
    /// Every kind the connector set can serve, in canonical order. The
    /// report's `updates` map carries one entry per kind listed here.
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Email,
        SourceKind::Calendar,
        SourceKind::Chat,
        SourceKind::Task,
        SourceKind::Repository,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Email => "email",
            SourceKind::Calendar => "calendar",
            SourceKind::Chat => "chat",
            SourceKind::Task => "task",
            SourceKind::Repository => "repository",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = OooError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "email" => Ok(SourceKind::Email),
            "calendar" => Ok(SourceKind::Calendar),
            "chat" => Ok(SourceKind::Chat),
            "task" => Ok(SourceKind::Task),
            "repository" => Ok(SourceKind::Repository),
            other => Err(OooError::Configuration(format!(
                "unknown source kind: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PriorityTier
// ---------------------------------------------------------------------------

/// Urgency tier for action items and per-source updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityTier {
    P0,
    P1,
    P2,
}

impl PriorityTier {
    /// Urgency rank: P0 is the most urgent.
    fn urgency(self) -> u8 {
        match self {
            PriorityTier::P0 => 2,
            PriorityTier::P1 => 1,
            PriorityTier::P2 => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::P0 => "P0",
            PriorityTier::P1 => "P1",
            PriorityTier::P2 => "P2",
        }
    }
}

// Total order by urgency: P0 > P1 > P2.
impl PartialOrd for PriorityTier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityTier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.urgency().cmp(&other.urgency())
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SourceRecord
// ---------------------------------------------------------------------------

/// One domain-tagged record produced by a connector query. Read-only after
/// creation; lives for a single orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub source: SourceKind,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// Raw domain payload (body, message text, task description, …), kept
    /// verbatim so the data-collection pass sees everything the source had.
    pub raw_context: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
