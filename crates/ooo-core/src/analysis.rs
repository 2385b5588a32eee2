//! Analysis task dispatch: one independent model invocation per report facet.
//!
//! Each task is fully self-contained — template, snapshot framing, timeout —
//! so a failure in one never disturbs its siblings. The orchestrator fans
//! the three out concurrently and captures each result independently.

use std::time::Duration;

use ooo_model::ModelInvoker;

// ---------------------------------------------------------------------------
// AnalysisKind
// ---------------------------------------------------------------------------

/// The three report facets, each produced by its own analysis pass over the
/// identical collected-data snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Summary,
    ActionItems,
    Priorities,
}

impl AnalysisKind {
    pub fn template_name(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => "summary",
            AnalysisKind::ActionItems => "action_items",
            AnalysisKind::Priorities => "priority_analysis",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => "summary",
            AnalysisKind::ActionItems => "action-items",
            AnalysisKind::Priorities => "priorities",
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskFailure
// ---------------------------------------------------------------------------

/// One task failed invocation, timed out, or (later, in the merge) failed
/// extraction. Recovered locally; only all-three-failed escalates.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub kind: AnalysisKind,
    pub reason: String,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} task failed: {}", self.kind, self.reason)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Append the collected-data snapshot to an analysis prompt. The snapshot is
/// opaque text; it is framed identically for all three tasks.
pub fn frame_with_snapshot(prompt: &str, snapshot: &str) -> String {
    format!("{prompt}\n\n## Data Collected\n```json\n{snapshot}\n```")
}

/// Drive one analysis invocation to completion under the timeout bound.
///
/// Always resolves — errors become [`TaskFailure`] values so the caller can
/// await all three tasks without any of them aborting the others.
pub async fn run_analysis(
    model: &dyn ModelInvoker,
    kind: AnalysisKind,
    prompt: String,
    timeout: Duration,
) -> Result<String, TaskFailure> {
    tracing::debug!(task = %kind, prompt_len = prompt.len(), "analysis task dispatched");
    match tokio::time::timeout(timeout, model.invoke(&prompt)).await {
        Ok(Ok(text)) => {
            tracing::debug!(task = %kind, output_len = text.len(), "analysis task complete");
            Ok(text)
        }
        Ok(Err(e)) => {
            tracing::warn!(task = %kind, error = %e, "analysis task failed");
            Err(TaskFailure {
                kind,
                reason: e.to_string(),
            })
        }
        Err(_) => {
            tracing::warn!(task = %kind, timeout_s = timeout.as_secs(), "analysis task timed out");
            Err(TaskFailure {
                kind,
                reason: format!("timed out after {}s", timeout.as_secs()),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
