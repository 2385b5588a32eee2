//! `ooo-model` — the model-invocation capability for the ooo summarizer.
//!
//! The orchestration core treats "run a natural-language prompt against an
//! LLM and get back text" as an external capability with a narrow contract:
//! prompt text in, raw text out, no guarantee whatsoever on the structure of
//! the output. This crate provides that capability two ways:
//!
//! ```text
//! ModelInvoker (trait)   ← the seam the orchestrator depends on
//!     │
//!     ├─ ModelClient     ← OpenAI-compatible /chat/completions over reqwest
//!     └─ test stubs      ← deterministic canned responses (in ooo-core tests)
//! ```
//!
//! Structured-output recovery is deliberately *not* this crate's job — the
//! extractor in `ooo-core` owns that.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ModelClient, ModelConfig};
pub use error::ModelError;
pub use types::{ChatMessage, ChatRequest, ChatResponse};

use futures::future::BoxFuture;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ModelError>;

/// The model-invocation seam.
///
/// `invoke` takes fully rendered prompt text and resolves to the model's raw
/// textual reply. Implementations may fail on transport or auth problems and
/// must be assumed to occasionally return text that is not parseable as any
/// structured format.
pub trait ModelInvoker: Send + Sync {
    fn invoke<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}
