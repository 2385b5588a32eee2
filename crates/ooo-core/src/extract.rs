//! Recovery of structured JSON from free-form model output.
//!
//! The model invocation contract guarantees nothing about output shape: the
//! JSON the analysis prompts ask for may arrive wrapped in explanatory prose,
//! markdown fences, or not at all. `extract` runs an ordered ladder of
//! strategies and returns the first value that parses. The ordering is
//! deliberate — an explicitly fenced block is the strongest signal and must
//! not be overridden by a looser brace scan picking up an unrelated object.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// All strategies failed. Carries the original text so the caller can decide
/// its own fallback (raw text as summary, empty structure for everything
/// else).
#[derive(Debug, Clone, Error)]
#[error("no parseable structured value in model output ({} bytes)", raw.len())]
pub struct ExtractionFailure {
    pub raw: String,
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("valid regex"))
}

/// Recover a JSON value from `text`. Never panics on malformed input.
///
/// Strategies, first success wins:
/// 1. fenced ````json` block
/// 2. span from the first `{` to the last `}`
/// 3. every balanced `{…}` candidate, in order of appearance
/// 4. the whole trimmed text
pub fn extract(text: &str) -> Result<Value, ExtractionFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionFailure { raw: text.into() });
    }

    // 1. Fenced block tagged as json.
    if let Some(caps) = fence_re().captures(trimmed) {
        if let Ok(value) = serde_json::from_str(caps[1].trim()) {
            tracing::trace!("extracted via fenced block");
            return Ok(value);
        }
    }

    // 2. Outer-braces span: tolerates prose before and after one object.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str(trimmed[start..=end].trim()) {
                tracing::trace!("extracted via outer-brace span");
                return Ok(value);
            }
        }
    }

    // 3. Balanced-brace candidates, first parseable one wins.
    for candidate in brace_candidates(trimmed) {
        if let Ok(value) = serde_json::from_str(candidate) {
            tracing::trace!("extracted via brace-candidate scan");
            return Ok(value);
        }
    }

    // 4. Whole text.
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    Err(ExtractionFailure { raw: text.into() })
}

/// Every balanced `{…}` substring, outermost first in order of appearance.
///
/// Depth tracking skips braces inside JSON string literals so `{"a": "}"}`
/// yields one candidate, not a truncated one.
fn brace_candidates(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = matching_brace(bytes, i) {
                candidates.push(&text[i..=end]);
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    candidates
}

/// Index of the brace closing the one at `open`, or `None` if unbalanced.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
