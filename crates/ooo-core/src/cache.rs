//! Durable report cache keyed by run identity.
//!
//! One JSON file per identity under the cache directory. Entries persist
//! until externally cleared; there is no eviction. This is a correctness aid
//! for reproducible scenarios, not a production cache.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::atomic_write;
use crate::report::Report;
use crate::types::TimeRange;

// ---------------------------------------------------------------------------
// RunIdentity
// ---------------------------------------------------------------------------

/// Deterministic key identifying one reproducible scenario/invocation.
///
/// The base scheme is `<scenario>_<version>`. Because a scenario name alone
/// does not distinguish the same scenario regenerated over a different date
/// range, the key derivation is configurable: `with_time_range` folds the
/// range into the key, `with_version` bumps the fixed suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    scenario: String,
    version: String,
    range: Option<TimeRange>,
}

impl RunIdentity {
    pub fn new(scenario: impl Into<String>) -> Self {
        RunIdentity {
            scenario: slugify(&scenario.into()),
            version: "v1".into(),
            range: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = slugify(&version.into());
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    /// The filename-safe cache key.
    pub fn key(&self) -> String {
        match self.range {
            Some(r) => format!(
                "{}_{}_{}_{}",
                self.scenario,
                r.start().format("%Y%m%d"),
                r.end().format("%Y%m%d"),
                self.version
            ),
            None => format!("{}_{}", self.scenario, self.version),
        }
    }
}

/// Filename-safe form of a user-supplied scenario name.
fn slugify(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ReportCache
// ---------------------------------------------------------------------------

/// File-per-identity report store.
pub struct ReportCache {
    cache_dir: PathBuf,
}

impl ReportCache {
    /// Cache files live at `<cache_dir>/agent_report_<key>.json`. The
    /// directory is created lazily on the first `put`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        ReportCache {
            cache_dir: cache_dir.into(),
        }
    }

    /// Return the cached report for `identity`, or `None`.
    ///
    /// A missing file is a miss. An unreadable or undecodable file is also
    /// treated as a miss (logged), so a corrupt entry forces re-computation
    /// instead of failing the run.
    pub fn get(&self, identity: &RunIdentity) -> Option<Report> {
        let path = self.path(identity);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache entry, ignoring");
                None
            }
        }
    }

    /// Persist `report` under `identity`. Overwrites any existing entry;
    /// writing the same identity twice is not an error.
    pub fn put(&self, identity: &RunIdentity, report: &Report) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        atomic_write(&self.path(identity), json.as_bytes())
    }

    fn path(&self, identity: &RunIdentity) -> PathBuf {
        self.cache_dir
            .join(format!("agent_report_{}.json", identity.key()))
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;
    use tempfile::TempDir;

    fn cache() -> (ReportCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = ReportCache::new(dir.path());
        (cache, dir)
    }

    #[test]
    fn get_returns_none_when_no_file() {
        let (cache, _dir) = cache();
        assert!(cache.get(&RunIdentity::new("test_case_1")).is_none());
    }

    #[test]
    fn put_then_get_round_trips() {
        let (cache, _dir) = cache();
        let id = RunIdentity::new("test_case_1");
        let report = Report::fallback("cached summary", &SourceKind::ALL);
        cache.put(&id, &report).unwrap();
        assert_eq!(cache.get(&id).unwrap(), report);
    }

    #[test]
    fn put_is_idempotent_overwrite() {
        let (cache, _dir) = cache();
        let id = RunIdentity::new("scenario");
        cache
            .put(&id, &Report::fallback("first", &SourceKind::ALL))
            .unwrap();
        cache
            .put(&id, &Report::fallback("second", &SourceKind::ALL))
            .unwrap();
        assert_eq!(cache.get(&id).unwrap().summary, "second");
    }

    #[test]
    fn identities_with_different_versions_do_not_collide() {
        let (cache, _dir) = cache();
        let v1 = RunIdentity::new("scenario");
        let v2 = RunIdentity::new("scenario").with_version("v2");
        cache
            .put(&v1, &Report::fallback("one", &SourceKind::ALL))
            .unwrap();
        cache
            .put(&v2, &Report::fallback("two", &SourceKind::ALL))
            .unwrap();
        assert_eq!(cache.get(&v1).unwrap().summary, "one");
        assert_eq!(cache.get(&v2).unwrap().summary, "two");
    }

    #[test]
    fn time_range_component_separates_regenerated_scenarios() {
        let a = RunIdentity::new("scenario")
            .with_time_range(TimeRange::parse("2024-01-01", "2024-01-03").unwrap());
        let b = RunIdentity::new("scenario")
            .with_time_range(TimeRange::parse("2024-02-01", "2024-02-14").unwrap());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn scenario_names_are_sanitized_for_filenames() {
        let id = RunIdentity::new("Test Case/1");
        assert_eq!(id.key(), "test-case-1_v1");
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let (cache, dir) = cache();
        let id = RunIdentity::new("scenario");
        std::fs::write(
            dir.path().join(format!("agent_report_{}.json", id.key())),
            "not json",
        )
        .unwrap();
        assert!(cache.get(&id).is_none());
    }
}
