//! Report validation, as consumed by the external test harness.
//!
//! The orchestrator never calls this; it only has to produce reports capable
//! of passing it. Validation runs against the serialized JSON value rather
//! than the typed [`Report`](crate::report::Report) so that key-totality
//! violations are actually observable.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::types::SourceKind;

// ---------------------------------------------------------------------------
// ScenarioManifest
// ---------------------------------------------------------------------------

/// Which record ids a seeded scenario considers signal vs noise.
#[derive(Debug, Clone, Default)]
pub struct ScenarioManifest {
    pub important: BTreeSet<String>,
    pub noise: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: &'static str,
    pub detail: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule, self.detail)
    }
}

// ---------------------------------------------------------------------------
// Context quality
// ---------------------------------------------------------------------------

/// Proxy for "meaningful context": at least 20 characters and 4 words.
pub fn context_is_meaningful(context: &str) -> bool {
    context.len() >= 20 && context.split_whitespace().count() >= 4
}

// ---------------------------------------------------------------------------
// ReportValidator
// ---------------------------------------------------------------------------

/// Checks a serialized report against the schema and priority invariants.
pub struct ReportValidator {
    kinds: Vec<SourceKind>,
}

impl ReportValidator {
    pub fn new(kinds: &[SourceKind]) -> Self {
        ReportValidator {
            kinds: kinds.to_vec(),
        }
    }

    /// Run every check; an empty result means the report is valid. Pass a
    /// manifest to additionally check signal placement and noise
    /// suppression.
    pub fn validate(&self, report: &Value, manifest: Option<&ScenarioManifest>) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.check_schema(report, &mut violations);
        self.check_entries(report, &mut violations);
        if let Some(m) = manifest {
            self.check_priorities(report, m, &mut violations);
        }
        violations
    }

    fn check_schema(&self, report: &Value, out: &mut Vec<Violation>) {
        for key in ["summary", "action_items", "updates"] {
            if report.get(key).is_none() {
                out.push(Violation {
                    rule: "schema",
                    detail: format!("missing top-level key '{key}'"),
                });
            }
        }

        for tier in ["P0", "P1", "P2"] {
            match report.pointer(&format!("/action_items/{tier}")) {
                Some(v) if v.is_array() => {
                    if v.as_array().is_some_and(|a| a.iter().any(Value::is_null)) {
                        out.push(Violation {
                            rule: "schema",
                            detail: format!("action_items.{tier} contains a null entry"),
                        });
                    }
                }
                _ => out.push(Violation {
                    rule: "schema",
                    detail: format!("action_items.{tier} is missing or not a list"),
                }),
            }
        }

        for kind in &self.kinds {
            for tier in ["P0", "P1"] {
                let path = format!("/updates/{kind}/{tier}");
                if !report.pointer(&path).is_some_and(Value::is_array) {
                    out.push(Violation {
                        rule: "schema",
                        detail: format!("updates.{kind}.{tier} is missing or not a list"),
                    });
                }
            }
        }
    }

    /// Per-entry format invariants: meaningful context everywhere, and an
    /// unambiguous calendar due date on every action item.
    fn check_entries(&self, report: &Value, out: &mut Vec<Violation>) {
        for tier in ["P0", "P1", "P2"] {
            for (i, item) in tier_entries(report, &format!("/action_items/{tier}")) {
                check_context(item, &format!("action_items.{tier}[{i}]"), out);
                let due = item.get("due_date").and_then(Value::as_str).unwrap_or("");
                if NaiveDate::parse_from_str(due, "%Y-%m-%d").is_err() {
                    out.push(Violation {
                        rule: "due_date",
                        detail: format!("action_items.{tier}[{i}] due_date '{due}' is not YYYY-MM-DD"),
                    });
                }
            }
        }

        for kind in &self.kinds {
            for tier in ["P0", "P1"] {
                for (i, entry) in tier_entries(report, &format!("/updates/{kind}/{tier}")) {
                    check_context(entry, &format!("updates.{kind}.{tier}[{i}]"), out);
                }
            }
        }
    }

    fn check_priorities(&self, report: &Value, manifest: &ScenarioManifest, out: &mut Vec<Violation>) {
        let p0_ids = self.p0_ids(report);

        if !manifest.important.is_empty() && manifest.important.is_disjoint(&p0_ids) {
            out.push(Violation {
                rule: "important",
                detail: "no important record id appears in any P0 tier".into(),
            });
        }

        let p0_action_ids: BTreeSet<String> = tier_entries(report, "/action_items/P0")
            .filter_map(|(_, item)| item.get("id").and_then(Value::as_str).map(str::to_owned))
            .collect();
        let noise_hits = p0_action_ids.intersection(&manifest.noise).count();
        if noise_hits > 1 {
            out.push(Violation {
                rule: "noise",
                detail: format!("{noise_hits} noise record ids appear among P0 action items"),
            });
        }
    }

    /// Every record id present in any P0 tier, action items and updates both.
    fn p0_ids(&self, report: &Value) -> BTreeSet<String> {
        let mut ids: BTreeSet<String> = tier_entries(report, "/action_items/P0")
            .filter_map(|(_, e)| e.get("id").and_then(Value::as_str).map(str::to_owned))
            .collect();
        for kind in &self.kinds {
            ids.extend(
                tier_entries(report, &format!("/updates/{kind}/P0"))
                    .filter_map(|(_, e)| e.get("id").and_then(Value::as_str).map(str::to_owned)),
            );
        }
        ids
    }
}

fn tier_entries<'a>(
    report: &'a Value,
    pointer: &str,
) -> impl Iterator<Item = (usize, &'a Value)> + 'a {
    report
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .unwrap_or_default()
        .enumerate()
}

fn check_context(entry: &Value, at: &str, out: &mut Vec<Violation>) {
    let context = entry.get("context").and_then(Value::as_str).unwrap_or("");
    if !context_is_meaningful(context) {
        out.push(Violation {
            rule: "context",
            detail: format!("{at} context is too short to be meaningful"),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
