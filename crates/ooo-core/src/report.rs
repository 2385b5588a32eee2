//! Report aggregate and the merge step that builds it from the three
//! analysis outputs.
//!
//! The merge is deliberately lenient: each tier list decodes independently,
//! and a tier that fails to decode degrades to an empty list rather than
//! carrying a partial or malformed item. The report shape itself is an
//! unconditional guarantee — every tier key and every known source key is
//! present even when all three analysis passes fail.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::SourceKind;

// ---------------------------------------------------------------------------
// ActionItem / UpdateEntry
// ---------------------------------------------------------------------------

/// One actionable follow-up recovered from the action-items analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub due_date: NaiveDate,
    pub source: SourceKind,
    pub context: String,
}

/// One per-source update recovered from the priority analysis pass.
/// Same shape as [`ActionItem`] except the due date is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub source: SourceKind,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Tier containers
// ---------------------------------------------------------------------------

/// Action items bucketed by tier. All three keys always serialize, empty or
/// not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionItems {
    #[serde(rename = "P0", default)]
    pub p0: Vec<ActionItem>,
    #[serde(rename = "P1", default)]
    pub p1: Vec<ActionItem>,
    #[serde(rename = "P2", default)]
    pub p2: Vec<ActionItem>,
}

/// Per-source updates. Only P0 and P1 exist for updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceUpdates {
    #[serde(rename = "P0", default)]
    pub p0: Vec<UpdateEntry>,
    #[serde(rename = "P1", default)]
    pub p1: Vec<UpdateEntry>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The root aggregate returned to the caller and persisted to the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: String,
    pub action_items: ActionItems,
    pub updates: BTreeMap<SourceKind, SourceUpdates>,
}

impl Report {
    /// The schema-valid empty shape: every tier key present, every known
    /// source present with empty P0/P1 lists.
    pub fn fallback(summary: impl Into<String>, kinds: &[SourceKind]) -> Self {
        Report {
            summary: summary.into(),
            action_items: ActionItems::default(),
            updates: empty_updates(kinds),
        }
    }

    /// True if no tier anywhere holds an entry.
    pub fn is_empty(&self) -> bool {
        self.action_items.p0.is_empty()
            && self.action_items.p1.is_empty()
            && self.action_items.p2.is_empty()
            && self.updates.values().all(|u| u.p0.is_empty() && u.p1.is_empty())
    }
}

/// One empty `SourceUpdates` per kind.
pub fn empty_updates(kinds: &[SourceKind]) -> BTreeMap<SourceKind, SourceUpdates> {
    kinds
        .iter()
        .map(|k| (*k, SourceUpdates::default()))
        .collect()
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Build the final report from the three extracted analysis values.
///
/// `None` for a value means that task failed invocation or extraction.
/// The summary task alone falls back to its raw text when extraction failed;
/// the other two degrade to schema-valid empty structures. That asymmetry
/// matches the long-observed behavior of this pipeline and is kept on
/// purpose.
pub fn merge_report(
    summary_value: Option<&Value>,
    summary_raw: Option<&str>,
    action_items_value: Option<&Value>,
    updates_value: Option<&Value>,
    kinds: &[SourceKind],
) -> Report {
    let summary = match summary_value {
        Some(v) => v
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        None => summary_raw.unwrap_or_default().to_string(),
    };

    let action_items = action_items_value
        .and_then(|v| v.get("action_items"))
        .map(action_items_from_value)
        .unwrap_or_default();

    let updates = updates_value
        .and_then(|v| v.get("updates"))
        .map(|v| updates_from_value(v, kinds))
        .unwrap_or_else(|| empty_updates(kinds));

    Report {
        summary,
        action_items,
        updates,
    }
}

/// Decode one tier list; any failure yields an empty list, never a partial
/// one.
fn lenient_tier<T: DeserializeOwned>(obj: &Value, key: &str) -> Vec<T> {
    match obj.get(key) {
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            tracing::warn!(tier = key, error = %e, "tier failed to decode, dropping");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

fn action_items_from_value(v: &Value) -> ActionItems {
    ActionItems {
        p0: lenient_tier(v, "P0"),
        p1: lenient_tier(v, "P1"),
        p2: lenient_tier(v, "P2"),
    }
}

/// Decode the updates map, keeping exactly one entry per known kind. Kinds
/// absent from the model output get empty tiers; kinds the model invented
/// are dropped.
fn updates_from_value(v: &Value, kinds: &[SourceKind]) -> BTreeMap<SourceKind, SourceUpdates> {
    kinds
        .iter()
        .map(|kind| {
            let source = v
                .get(kind.as_str())
                .map(|entry| SourceUpdates {
                    p0: lenient_tier(entry, "P0"),
                    p1: lenient_tier(entry, "P1"),
                })
                .unwrap_or_default();
            (*kind, source)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
