//! # faultline-rag
//!
//! Query-time retrieval and answer synthesis: embed the query, rank similar
//! incidents from the store, compute category statistics over the full
//! dataset, and compose a structured answer with a deterministic fallback
//! when the chat backend is unavailable.

pub mod context;
pub mod engine;
pub mod responder;
pub mod stats;

pub use faultline_core::{Error, Result};

pub use context::{build_context, build_prompt, NO_RESULTS_CONTEXT, SYSTEM_PROMPT};
pub use engine::{AskOptions, EngineAnswer, RagEngine};
pub use responder::{fallback_answer, format_answer, synthesize, SynthesizedAnswer};
pub use stats::{resolve_category, CategoryStats};
