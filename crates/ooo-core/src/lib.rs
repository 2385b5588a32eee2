//! `ooo-core` — orchestration core of the ooo summarizer.
//!
//! Aggregates records from several independently queried sources over a date
//! range, drives three concurrent LLM analysis passes over one collected-data
//! snapshot, recovers structured JSON from the free-text model output, and
//! merges the partial results into one schema-complete report.
//!
//! ```text
//! TimeRange ─▶ Orchestrator ─▶ SessionGroup (connectors, scoped)
//!                  │
//!                  ├─ data-collection pass ─▶ snapshot (opaque string)
//!                  ├─ summary / action-items / priorities (concurrent)
//!                  ├─ extract::extract per task output
//!                  └─ Report ─▶ ReportCache + reports/ artifact
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod connector;
pub mod error;
pub mod extract;
pub mod io;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod types;
pub mod validate;

pub use error::{OooError, Result};
pub use orchestrator::Orchestrator;
pub use report::Report;
pub use types::{PriorityTier, SourceKind, SourceRecord, TimeRange};
